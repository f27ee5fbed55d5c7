//! Construction of stages by name.

use std::collections::BTreeMap;

use crate::config::{ConfigError, StageSpec};
use crate::driver::BuildError;

use super::{Stage, StageError, stages};

/// Builds a stage from its options.
pub type StageFactory = fn(&serde_json::Value) -> Result<Stage, StageError>;

/// Maps stage names to factories.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
  factories: BTreeMap<String, StageFactory>,
}

impl StageRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry holding every built-in stage.
  pub fn builtin() -> Self {
    let mut registry = Self::new();
    registry.register(stages::replace::NAME, stages::replace::create);
    registry.register(stages::polyfills::NAME, stages::polyfills::create);
    registry.register(stages::resolve::NAME, stages::resolve::create);
    registry.register(stages::alias::NAME, stages::alias::create);
    registry.register(stages::json::NAME, stages::json::create);
    registry.register(stages::commonjs::NAME, stages::commonjs::create);
    registry.register(stages::string::NAME, stages::string::create);
    registry.register(stages::minify::NAME, stages::minify::create);
    registry.register(stages::sizes::NAME, stages::sizes::create);
    registry.register(stages::filesize::NAME, stages::filesize::create);
    registry
  }

  /// Add or replace a stage factory.
  pub fn register(&mut self, name: &str, factory: StageFactory) {
    self.factories.insert(name.to_string(), factory);
  }

  /// Registered stage names, sorted.
  pub fn names(&self) -> Vec<&str> {
    self.factories.keys().map(String::as_str).collect()
  }

  /// Construct the stage a `StageSpec` names.
  ///
  /// # Errors
  ///
  /// `ConfigError::UnknownStage` for an unregistered name, or the stage's
  /// own `StageError` when its options are invalid.
  pub fn create(&self, spec: &StageSpec) -> Result<Stage, BuildError> {
    let factory = self.factories.get(&spec.name).ok_or_else(|| ConfigError::UnknownStage {
      name: spec.name.clone(),
      known: self.names().join(", "),
    })?;
    Ok(factory(&spec.options)?)
  }
}
