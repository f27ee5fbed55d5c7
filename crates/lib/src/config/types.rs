//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The declarative description of one build.
///
/// Immutable once loaded; the driver only ever borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
  /// Entry module, relative to `root`.
  #[serde(default)]
  pub entry: String,

  /// Project root. Relative roots are taken relative to the config file.
  #[serde(default)]
  pub root: PathBuf,

  #[serde(default)]
  pub outputs: Vec<OutputDescriptor>,

  /// Stages in application order.
  #[serde(default)]
  pub stages: Vec<StageSpec>,

  /// Module names supplied by the host at runtime and never bundled.
  #[serde(default)]
  pub externals: Vec<String>,

  /// Global variable per external, used by `iife` outputs.
  #[serde(default)]
  pub globals: BTreeMap<String, String>,
}

/// One requested artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescriptor {
  /// Destination path, relative to the project root.
  pub file: PathBuf,

  #[serde(default)]
  pub format: OutputFormat,

  #[serde(default)]
  pub sourcemap: bool,

  /// Global variable the entry's exports are assigned to (`iife` only).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
  /// A single CommonJS module; externals are loaded with `require`.
  #[default]
  #[serde(alias = "commonjs")]
  Cjs,
  /// A script assigning the entry's exports to a global variable.
  Iife,
}

impl std::fmt::Display for OutputFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      OutputFormat::Cjs => write!(f, "cjs"),
      OutputFormat::Iife => write!(f, "iife"),
    }
  }
}

/// A stage by name, with options the stage interprets itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
  pub name: String,

  #[serde(default)]
  pub options: serde_json::Value,
}

impl StageSpec {
  pub fn new(name: impl Into<String>, options: serde_json::Value) -> Self {
    Self {
      name: name.into(),
      options,
    }
  }
}

/// Errors in the configuration itself, raised before any stage runs.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("config has no entry module")]
  MissingEntry,

  #[error("config declares no outputs")]
  NoOutputs,

  #[error("output {0} is declared more than once")]
  DuplicateOutput(PathBuf),

  #[error("iife output {file} needs a `name`")]
  MissingName { file: PathBuf },

  #[error("iife output {file} has name '{name}', which is not a valid JavaScript identifier")]
  InvalidName { file: PathBuf, name: String },

  #[error("iife output {file} has no global for external '{external}'")]
  MissingGlobal { file: PathBuf, external: String },

  #[error("unknown stage '{name}' (known stages: {known})")]
  UnknownStage { name: String, known: String },

  #[error("stage '{stage}' is out of order: {reason}")]
  StageOrder { stage: String, reason: String },
}
