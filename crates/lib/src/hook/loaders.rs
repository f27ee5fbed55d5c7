//! Running host rules against files.
//!
//! This is the host side of the hook: given the rule list of a host
//! configuration, decide which loader handles a file and load it.

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::js;

use super::{AssetRule, DEFAULT_LOADER, HookError, HostConfig, RAW_LOADER};

/// Turns file contents into module source.
pub trait Loader: Send + Sync + fmt::Debug {
  fn id(&self) -> &str;

  fn load(&self, path: &Path, contents: &str) -> String;
}

/// Exports the file's text as a string.
#[derive(Debug)]
pub struct RawLoader;

impl Loader for RawLoader {
  fn id(&self) -> &str {
    RAW_LOADER
  }

  fn load(&self, _path: &Path, contents: &str) -> String {
    format!("export default {};\n", js::string_literal(contents))
  }
}

/// Treats the file as a script and passes it through.
#[derive(Debug)]
pub struct DefaultLoader;

impl Loader for DefaultLoader {
  fn id(&self) -> &str {
    DEFAULT_LOADER
  }

  fn load(&self, _path: &Path, contents: &str) -> String {
    contents.to_string()
  }
}

/// A file after its loader ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAsset {
  pub path: PathBuf,
  pub loader: String,
  pub source: String,
}

/// The `{ test, loader }` rules of a host configuration, compiled.
#[derive(Debug)]
pub struct HostLoaders {
  rules: Vec<(Regex, String)>,
  loaders: Vec<Box<dyn Loader>>,
}

impl HostLoaders {
  /// Compile the rules of `config`.
  ///
  /// Rules of other shapes (`use` lists and the like) belong to the host and
  /// are skipped.
  pub fn from_config(config: &HostConfig) -> Result<Self, HookError> {
    let mut rules = Vec::new();
    for value in &config.module.rules {
      let Ok(rule) = serde_json::from_value::<AssetRule>(value.clone()) else {
        debug!(rule = %value, "skipping host rule");
        continue;
      };
      let test = Regex::new(&rule.test).map_err(|source| HookError::Pattern {
        pattern: rule.test.clone(),
        source,
      })?;
      rules.push((test, rule.loader));
    }
    Ok(Self {
      rules,
      loaders: vec![Box::new(RawLoader), Box::new(DefaultLoader)],
    })
  }

  /// The loader id for `path`. The last matching rule wins.
  pub fn loader_for(&self, path: &Path) -> &str {
    let path = path.to_string_lossy().replace('\\', "/");
    self
      .rules
      .iter()
      .rev()
      .find(|(test, _)| test.is_match(&path))
      .map(|(_, loader)| loader.as_str())
      .unwrap_or(DEFAULT_LOADER)
  }

  /// Read `path` and run its loader.
  pub fn load(&self, path: &Path) -> Result<LoadedAsset, HookError> {
    let id = self.loader_for(path);
    let loader = self
      .loaders
      .iter()
      .find(|loader| loader.id() == id)
      .ok_or_else(|| HookError::UnknownLoader(id.to_string()))?;
    let contents = std::fs::read_to_string(path).map_err(|source| HookError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(LoadedAsset {
      path: path.to_path_buf(),
      loader: id.to_string(),
      source: loader.load(path, &contents),
    })
  }
}
