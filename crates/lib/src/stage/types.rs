//! Types shared by every stage.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::graph::{ImportKind, ModuleId};

/// What went wrong inside a stage.
#[derive(Debug, Error)]
pub enum StageErrorKind {
  /// A recognized option has a value the stage cannot use.
  #[error("invalid option `{key}`: {reason}")]
  InvalidOption { key: String, reason: String },

  /// The module text is malformed for this stage.
  #[error("invalid syntax: {0}")]
  InvalidSyntax(String),

  /// The module uses a construct the stage does not handle.
  #[error("unsupported: {0}")]
  Unsupported(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// A stage rejected its options or its input.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed{}: {kind}", describe_module(.module))]
pub struct StageError {
  pub stage: String,
  pub module: Option<ModuleId>,
  #[source]
  pub kind: StageErrorKind,
}

fn describe_module(module: &Option<ModuleId>) -> String {
  match module {
    Some(id) => format!(" on {}", id),
    None => String::new(),
  }
}

impl StageError {
  pub fn new(stage: impl Into<String>, kind: StageErrorKind) -> Self {
    Self {
      stage: stage.into(),
      module: None,
      kind,
    }
  }

  pub fn invalid_option(stage: &str, key: &str, reason: impl Into<String>) -> Self {
    Self::new(
      stage,
      StageErrorKind::InvalidOption {
        key: key.to_string(),
        reason: reason.into(),
      },
    )
  }

  pub fn unsupported(stage: &str, message: impl Into<String>) -> Self {
    Self::new(stage, StageErrorKind::Unsupported(message.into()))
  }

  pub fn invalid_syntax(stage: &str, message: impl Into<String>) -> Self {
    Self::new(stage, StageErrorKind::InvalidSyntax(message.into()))
  }

  /// Attach the module the failure happened on.
  pub fn in_module(mut self, id: &ModuleId) -> Self {
    self.module = Some(id.clone());
    self
  }
}

/// Read-only build facts every stage hook can see.
#[derive(Debug, Clone)]
pub struct StageContext {
  pub root: PathBuf,
  pub externals: Vec<String>,
}

impl StageContext {
  pub fn new(config: &PipelineConfig) -> Self {
    Self {
      root: config.root.clone(),
      externals: config.externals.clone(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

/// One import specifier waiting to be resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
  pub specifier: &'a str,
  pub importer: &'a ModuleId,
  pub kind: ImportKind,
}

/// A message produced by a report hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
  pub stage: String,
  pub file: PathBuf,
  pub message: String,
}

/// Deserialize a stage's options.
///
/// `null` (no options table) means all defaults. Options types must default
/// every field so that each key can be checked on its own: when the table as
/// a whole is rejected, the first key (in sorted order) that fails alone is
/// reported.
pub fn parse_options<T>(stage: &str, options: &serde_json::Value) -> Result<T, StageError>
where
  T: DeserializeOwned + Default,
{
  if options.is_null() {
    return Ok(T::default());
  }
  let Some(table) = options.as_object() else {
    return Err(StageError::invalid_option(stage, "options", "expected a table"));
  };

  match serde_json::from_value::<T>(options.clone()) {
    Ok(parsed) => Ok(parsed),
    Err(err) => {
      let mut keys: Vec<&String> = table.keys().collect();
      keys.sort();
      for key in keys {
        let mut single = serde_json::Map::new();
        single.insert(key.clone(), table[key].clone());
        if let Err(key_err) = serde_json::from_value::<T>(serde_json::Value::Object(single)) {
          return Err(StageError::invalid_option(stage, key, key_err.to_string()));
        }
      }
      Err(StageError::invalid_option(stage, "options", err.to_string()))
    }
  }
}
