//! Pipeline configuration.
//!
//! A `PipelineConfig` is read from `packline.toml` or a JSON file with the
//! same schema:
//!
//! ```toml
//! entry = "component/index.tsx"
//! externals = ["react", "react-dom"]
//!
//! [[outputs]]
//! file = ".build/index.js"
//! format = "cjs"
//! sourcemap = true
//!
//! [[stages]]
//! name = "replace"
//! options.values = { "process.env.NODE_ENV" = '"production"' }
//!
//! [[stages]]
//! name = "resolve"
//! ```

mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{CONFIG_ENV, DEFAULT_CONFIG_FILE};
use crate::js;

pub use types::*;

/// The configuration file to use when none is given on the command line.
///
/// `$PACKLINE_CONFIG` when set and non-empty, otherwise `packline.toml` in
/// the current directory.
pub fn default_config_path() -> PathBuf {
  match std::env::var(CONFIG_ENV) {
    Ok(path) if !path.is_empty() => PathBuf::from(path),
    _ => PathBuf::from(DEFAULT_CONFIG_FILE),
  }
}

impl PipelineConfig {
  /// A config with the given root and entry and nothing else.
  pub fn new(root: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
    Self {
      entry: entry.into(),
      root: root.into(),
      outputs: Vec::new(),
      stages: Vec::new(),
      externals: Vec::new(),
      globals: Default::default(),
    }
  }

  pub fn with_output(mut self, output: OutputDescriptor) -> Self {
    self.outputs.push(output);
    self
  }

  pub fn with_stage(mut self, name: &str, options: serde_json::Value) -> Self {
    self.stages.push(StageSpec::new(name, options));
    self
  }

  pub fn with_external(mut self, name: &str) -> Self {
    self.externals.push(name.to_string());
    self
  }

  pub fn with_global(mut self, external: &str, global: &str) -> Self {
    self.globals.insert(external.to_string(), global.to_string());
    self
  }

  /// Load a config file. `.json` files are parsed as JSON, everything else
  /// as TOML.
  ///
  /// The root defaults to the directory containing the file; a relative
  /// root is joined onto that directory.
  ///
  /// # Errors
  ///
  /// Returns `ConfigError::Read` or `ConfigError::Parse`. The result is not
  /// validated; call [`PipelineConfig::validate`].
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let mut config: PipelineConfig = if is_json {
      serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
      })?
    } else {
      toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
      })?
    };

    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    let dir = dunce::canonicalize(&dir).unwrap_or(dir);
    config.root = if config.root.as_os_str().is_empty() {
      dir
    } else if config.root.is_absolute() {
      config.root
    } else {
      dir.join(&config.root)
    };
    config.root = dunce::canonicalize(&config.root).unwrap_or(config.root);

    debug!(config = %path.display(), root = %config.root.display(), "loaded config");
    Ok(config)
  }

  /// Check the structural invariants of the config.
  ///
  /// Stage names and options are checked separately when the pipeline is
  /// constructed.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.entry.trim().is_empty() {
      return Err(ConfigError::MissingEntry);
    }
    if self.outputs.is_empty() {
      return Err(ConfigError::NoOutputs);
    }

    let mut files = HashSet::new();
    for output in &self.outputs {
      if !files.insert(self.output_path(output)) {
        return Err(ConfigError::DuplicateOutput(output.file.clone()));
      }
      if output.format == OutputFormat::Iife {
        match output.name.as_deref() {
          None | Some("") => {
            return Err(ConfigError::MissingName {
              file: output.file.clone(),
            });
          }
          Some(name) if !js::is_identifier(name) => {
            return Err(ConfigError::InvalidName {
              file: output.file.clone(),
              name: name.to_string(),
            });
          }
          Some(_) => {}
        }
        if let Some(external) = self.externals.iter().find(|e| !self.globals.contains_key(*e)) {
          return Err(ConfigError::MissingGlobal {
            file: output.file.clone(),
            external: external.clone(),
          });
        }
      }
    }
    Ok(())
  }

  /// The entry module's path on disk.
  pub fn entry_path(&self) -> PathBuf {
    self.root.join(&self.entry)
  }

  /// Where an output is written.
  pub fn output_path(&self, output: &OutputDescriptor) -> PathBuf {
    self.root.join(&output.file)
  }
}

impl OutputDescriptor {
  pub fn new(file: impl Into<PathBuf>, format: OutputFormat) -> Self {
    Self {
      file: file.into(),
      format,
      sourcemap: false,
      name: None,
    }
  }

  pub fn with_sourcemap(mut self) -> Self {
    self.sourcemap = true;
    self
  }

  pub fn with_name(mut self, name: &str) -> Self {
    self.name = Some(name.to_string());
    self
  }
}
