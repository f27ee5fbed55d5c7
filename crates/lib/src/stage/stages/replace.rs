//! Literal token substitution over raw module text.
//!
//! Runs before imports are scanned, so a replaced token can change what a
//! module imports.

use std::collections::BTreeMap;
use std::path::Path;

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::graph::ModuleId;
use crate::stage::{Stage, StageError, TextStage, parse_options};

use super::{compile, match_path};

pub const NAME: &str = "replace";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Options {
  /// Token to replacement text.
  values: BTreeMap<String, String>,
  /// Only modules whose path matches are rewritten.
  include: Option<String>,
}

#[derive(Debug)]
pub struct Replace {
  pattern: Regex,
  values: BTreeMap<String, String>,
  include: Option<Regex>,
}

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  Ok(Stage::Text(Box::new(Replace::from_options(options)?)))
}

impl Replace {
  pub fn from_options(options: &serde_json::Value) -> Result<Self, StageError> {
    let options: Options = parse_options(NAME, options)?;
    if options.values.is_empty() {
      return Err(StageError::invalid_option(NAME, "values", "at least one token is required"));
    }
    if options.values.contains_key("") {
      return Err(StageError::invalid_option(NAME, "values", "tokens must not be empty"));
    }

    // Longest token first so the alternation prefers it at a shared position.
    let mut tokens: Vec<&String> = options.values.keys().collect();
    tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = tokens.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    let pattern = compile(NAME, "values", &alternation)?;

    let include = options
      .include
      .as_deref()
      .map(|p| compile(NAME, "include", p))
      .transpose()?;

    Ok(Self {
      pattern,
      values: options.values,
      include,
    })
  }
}

impl TextStage for Replace {
  fn name(&self) -> &str {
    NAME
  }

  fn applies_to(&self, path: &Path) -> bool {
    self.include.as_ref().is_none_or(|re| re.is_match(&match_path(path)))
  }

  fn apply(&self, _id: &ModuleId, source: &str) -> Result<String, StageError> {
    let replaced = self
      .pattern
      .replace_all(source, |caps: &Captures| self.values[&caps[0]].clone());
    Ok(replaced.into_owned())
  }
}
