//! Bundled replacements for Node built-ins.
//!
//! A built-in specifier (`path`, `node:events`, `fs/promises`) resolves to a
//! replacement module under the project root instead of the host module, so
//! artifacts meant for browsers carry their own implementation. Built-ins
//! without a replacement are left to ordinary resolution; the stage must
//! come before `resolve` to take precedence.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::graph::{ImportTarget, ModuleId};
use crate::stage::{GraphStage, ResolveRequest, Stage, StageContext, StageError, parse_options};

use super::resolve::{DEFAULT_EXTENSIONS, is_builtin, find_file};

pub const NAME: &str = "polyfills";

const DEFAULT_DIRECTORY: &str = "polyfills";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Options {
  /// Directory under the root searched for `<built-in>.js`.
  directory: String,
  /// Replacement path per built-in, relative to the root.
  modules: BTreeMap<String, String>,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      directory: DEFAULT_DIRECTORY.to_string(),
      modules: BTreeMap::new(),
    }
  }
}

#[derive(Debug)]
pub struct Polyfills {
  directory: PathBuf,
  modules: BTreeMap<String, PathBuf>,
}

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  Ok(Stage::Graph(Box::new(Polyfills::from_options(options)?)))
}

impl Polyfills {
  pub fn from_options(options: &serde_json::Value) -> Result<Self, StageError> {
    let options: Options = parse_options(NAME, options)?;
    if options.directory.trim().is_empty() {
      return Err(StageError::invalid_option(NAME, "directory", "must not be empty"));
    }
    if let Some(name) = options.modules.keys().find(|name| !is_builtin(name)) {
      return Err(StageError::invalid_option(
        NAME,
        "modules",
        format!("'{}' is not a Node built-in", name),
      ));
    }

    Ok(Self {
      directory: PathBuf::from(options.directory),
      modules: options
        .modules
        .into_iter()
        .map(|(name, path)| (bare_name(&name).to_string(), PathBuf::from(path)))
        .collect(),
    })
  }
}

/// `node:fs` and `fs` name the same built-in.
fn bare_name(specifier: &str) -> &str {
  specifier.strip_prefix("node:").unwrap_or(specifier)
}

impl GraphStage for Polyfills {
  fn name(&self) -> &str {
    NAME
  }

  fn resolve(&self, request: &ResolveRequest<'_>, ctx: &StageContext) -> Result<Option<ImportTarget>, StageError> {
    if !is_builtin(request.specifier) {
      return Ok(None);
    }
    let name = bare_name(request.specifier);
    let candidate = match self.modules.get(name) {
      Some(path) => ctx.root().join(path),
      None => ctx.root().join(&self.directory).join(name),
    };

    let found = find_file(&candidate, DEFAULT_EXTENSIONS);
    debug!(
      specifier = request.specifier,
      candidate = %candidate.display(),
      found = found.is_some(),
      "polyfill lookup"
    );
    Ok(found.map(|p| ImportTarget::Module(ModuleId::new(p))))
  }
}
