//! Pattern-based specifier rewriting.
//!
//! An entry only applies to specifiers whose extension is in its
//! `extensions` list (all specifiers when the list is empty). Anything else
//! is left to ordinary resolution.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::graph::{ImportTarget, ModuleId};
use crate::stage::{GraphStage, ResolveRequest, Stage, StageContext, StageError, parse_options};

use super::compile;
use super::resolve::{DEFAULT_EXTENSIONS, find_file};

pub const NAME: &str = "alias";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Options {
  entries: Vec<EntryOptions>,
}

#[derive(Debug, Deserialize)]
struct EntryOptions {
  find: String,
  replacement: String,
  #[serde(default)]
  extensions: Vec<String>,
}

#[derive(Debug)]
struct Entry {
  find: Regex,
  replacement: String,
  extensions: Vec<String>,
}

impl Entry {
  fn matches(&self, specifier: &str) -> bool {
    if !self.find.is_match(specifier) {
      return false;
    }
    if self.extensions.is_empty() {
      return true;
    }
    Path::new(specifier)
      .extension()
      .and_then(|e| e.to_str())
      .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.trim_start_matches('.') == ext))
  }

  fn lookup_extensions(&self) -> Vec<String> {
    if self.extensions.is_empty() {
      DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    } else {
      self.extensions.clone()
    }
  }
}

#[derive(Debug)]
pub struct Alias {
  entries: Vec<Entry>,
}

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  Ok(Stage::Graph(Box::new(Alias::from_options(options)?)))
}

impl Alias {
  pub fn from_options(options: &serde_json::Value) -> Result<Self, StageError> {
    let options: Options = parse_options(NAME, options)?;
    if options.entries.is_empty() {
      return Err(StageError::invalid_option(NAME, "entries", "at least one entry is required"));
    }

    let entries = options
      .entries
      .into_iter()
      .map(|entry| {
        Ok(Entry {
          find: compile(NAME, "entries", &entry.find)?,
          replacement: entry.replacement,
          extensions: entry.extensions,
        })
      })
      .collect::<Result<Vec<_>, StageError>>()?;
    Ok(Self { entries })
  }

  /// The path a specifier is rewritten to, before probing, or `None` when
  /// no entry applies. Relative replacements are taken relative to `root`.
  pub fn rewrite(&self, specifier: &str, root: &Path) -> Option<PathBuf> {
    let entry = self.entries.iter().find(|e| e.matches(specifier))?;
    let rewritten = entry.find.replace(specifier, entry.replacement.as_str());
    let path = PathBuf::from(rewritten.as_ref());
    Some(if path.is_absolute() { path } else { root.join(path) })
  }
}

impl GraphStage for Alias {
  fn name(&self) -> &str {
    NAME
  }

  fn resolve(&self, request: &ResolveRequest<'_>, ctx: &StageContext) -> Result<Option<ImportTarget>, StageError> {
    let Some(entry) = self.entries.iter().find(|e| e.matches(request.specifier)) else {
      return Ok(None);
    };
    let Some(path) = self.rewrite(request.specifier, ctx.root()) else {
      return Ok(None);
    };

    let found = find_file(&path, &entry.lookup_extensions());
    debug!(
      specifier = request.specifier,
      rewritten = %path.display(),
      found = found.is_some(),
      "alias applied"
    );
    Ok(found.map(|p| ImportTarget::Module(ModuleId::new(p))))
  }
}
