//! Types for the build driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, OutputFormat};
use crate::graph::ModuleId;
use crate::stage::{Diagnostic, StageError};
use crate::util::hash::ContentHash;

/// The single error a failed build reports.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Resolution(#[from] ResolutionError),

  #[error(transparent)]
  Stage(#[from] StageError),

  #[error(transparent)]
  Emission(#[from] EmitError),

  #[error("build cancelled")]
  Cancelled,
}

/// A module could not be located or read.
#[derive(Debug, Error)]
pub enum ResolutionError {
  #[error("entry module {0} not found")]
  MissingEntry(PathBuf),

  #[error("cannot resolve '{specifier}' imported by {importer}")]
  Unresolved { specifier: String, importer: ModuleId },

  #[error("failed to read module {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Writing an artifact failed. Nothing was committed.
#[derive(Debug, Error)]
#[error("failed to write {file}: {source}")]
pub struct EmitError {
  pub file: PathBuf,
  #[source]
  pub source: std::io::Error,
}

/// Aborts a build at the next wave or stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  /// `Err(BuildError::Cancelled)` once cancelled.
  pub fn check(&self) -> Result<(), BuildError> {
    if self.is_cancelled() {
      Err(BuildError::Cancelled)
    } else {
      Ok(())
    }
  }
}

/// Knobs for one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Maximum concurrent file reads while loading the graph.
  pub parallelism: usize,
  /// Render everything but write nothing.
  pub dry_run: bool,
  pub cancel: CancelToken,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      parallelism: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
      dry_run: false,
      cancel: CancelToken::new(),
    }
  }
}

/// Bytes one module contributed to an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleContribution {
  /// Module path relative to the project root.
  pub path: String,
  pub bytes: usize,
}

/// One rendered output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputArtifact {
  pub format: OutputFormat,
  /// Absolute destination path.
  pub file: PathBuf,
  #[serde(skip)]
  pub content: Vec<u8>,
  /// Source map JSON, written to `<file>.map`.
  #[serde(skip)]
  pub sourcemap: Option<String>,
  /// SHA-256 of `content`.
  pub digest: ContentHash,
  pub modules: Vec<ModuleContribution>,
}

impl OutputArtifact {
  /// Destination relative to `root`, with forward slashes.
  pub fn relative_file(&self, root: &Path) -> String {
    ModuleId::new(&self.file).relative_to(root)
  }

  pub fn sourcemap_file(&self) -> PathBuf {
    let mut path = self.file.as_os_str().to_os_string();
    path.push(crate::consts::SOURCEMAP_SUFFIX);
    PathBuf::from(path)
  }
}

/// What a successful build produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
  pub artifacts: Vec<OutputArtifact>,
  pub diagnostics: Vec<Diagnostic>,
  /// Modules in the graph after the last stage.
  pub modules: usize,
  /// Host references left in the artifacts (externals and built-ins).
  pub externals: Vec<String>,
  pub cycles: Vec<Vec<ModuleId>>,
  /// False for dry runs.
  pub written: bool,
}
