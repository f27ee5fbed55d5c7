//! The development-server asset hook.
//!
//! Unlike the build pipeline, the hook does not bundle anything. It edits a
//! host build configuration (a JSON document with a `module.rules` list) so
//! that the host loads matching files through a different loader:
//!
//! ```json
//! { "module": { "rules": [ { "test": "\\.css$", "loader": "raw-loader" } ] } }
//! ```
//!
//! The hook only ever appends a rule. Every other field of the host
//! configuration, and every rule already present, is carried through as is.

mod loaders;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

pub use loaders::{DefaultLoader, HostLoaders, LoadedAsset, Loader, RawLoader};

/// Pattern used when none is given.
pub const DEFAULT_TEST: &str = r"\.css$";
/// Loader id of the raw-text loader.
pub const RAW_LOADER: &str = "raw-loader";
/// Loader id used for files no rule matches.
pub const DEFAULT_LOADER: &str = "default";

#[derive(Debug, Error)]
pub enum HookError {
  #[error("invalid test pattern '{pattern}': {source}")]
  Pattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("unknown loader '{0}'")]
  UnknownLoader(String),

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse host configuration {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to write host configuration {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// The part of a host build configuration the hook understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
  #[serde(default)]
  pub module: HostModuleConfig,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostModuleConfig {
  /// Rules in host order. Kept as raw JSON so rule shapes the hook does not
  /// know survive untouched.
  #[serde(default)]
  pub rules: Vec<Value>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// A `{ test, loader }` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRule {
  /// Regular expression matched against the file path.
  pub test: String,
  pub loader: String,
}

/// Appends one asset rule to a host configuration.
#[derive(Debug, Clone)]
pub struct AssetHook {
  rule: AssetRule,
}

impl Default for AssetHook {
  fn default() -> Self {
    Self {
      rule: AssetRule {
        test: DEFAULT_TEST.to_string(),
        loader: RAW_LOADER.to_string(),
      },
    }
  }
}

impl AssetHook {
  /// A hook routing files matching `test` to `loader`.
  pub fn new(test: &str, loader: &str) -> Result<Self, HookError> {
    Regex::new(test).map_err(|source| HookError::Pattern {
      pattern: test.to_string(),
      source,
    })?;
    Ok(Self {
      rule: AssetRule {
        test: test.to_string(),
        loader: loader.to_string(),
      },
    })
  }

  pub fn rule(&self) -> &AssetRule {
    &self.rule
  }

  /// Append the hook's rule and hand the configuration back.
  pub fn apply(&self, mut config: HostConfig) -> HostConfig {
    let rule = serde_json::json!({
      "test": self.rule.test,
      "loader": self.rule.loader,
    });
    config.module.rules.push(rule);
    debug!(test = %self.rule.test, loader = %self.rule.loader, rules = config.module.rules.len(), "appended asset rule");
    config
  }
}

/// Read a host configuration JSON file.
pub fn read_host_config(path: &Path) -> Result<HostConfig, HookError> {
  let text = fs::read_to_string(path).map_err(|source| HookError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&text).map_err(|source| HookError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Serialize a host configuration as pretty JSON.
pub fn to_json(config: &HostConfig) -> String {
  let mut text = serde_json::to_string_pretty(config).unwrap_or_default();
  text.push('\n');
  text
}

/// Write a host configuration back to disk.
pub fn write_host_config(path: &Path, config: &HostConfig) -> Result<(), HookError> {
  fs::write(path, to_json(config)).map_err(|source| HookError::Write {
    path: path.to_path_buf(),
    source,
  })?;
  info!(path = %path.display(), rules = config.module.rules.len(), "wrote host configuration");
  Ok(())
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn apply_appends_and_keeps_existing_rules() {
    let config: HostConfig = serde_json::from_value(json!({
      "mode": "development",
      "module": {
        "rules": [{ "test": "\\.js$", "use": ["babel-loader"] }],
        "parser": { "javascript": {} }
      }
    }))
    .unwrap();

    let config = AssetHook::default().apply(config);
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["mode"], "development");
    assert_eq!(value["module"]["parser"], json!({ "javascript": {} }));
    assert_eq!(
      value["module"]["rules"],
      json!([
        { "test": "\\.js$", "use": ["babel-loader"] },
        { "test": "\\.css$", "loader": "raw-loader" }
      ])
    );
  }

  #[test]
  fn apply_twice_appends_twice() {
    let hook = AssetHook::default();
    let config = hook.apply(hook.apply(HostConfig::default()));
    assert_eq!(config.module.rules.len(), 2);
  }

  #[test]
  fn new_rejects_bad_patterns() {
    let err = AssetHook::new("(", RAW_LOADER).unwrap_err();
    assert!(matches!(err, HookError::Pattern { .. }));
    assert_eq!(AssetHook::new(r"\.svg$", RAW_LOADER).unwrap().rule().test, r"\.svg$");
  }

  #[test]
  fn read_and_write_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("host.json");
    fs::write(&path, r#"{"devtool": false, "module": {"rules": []}}"#).unwrap();

    let config = AssetHook::default().apply(read_host_config(&path).unwrap());
    write_host_config(&path, &config).unwrap();

    let reread = read_host_config(&path).unwrap();
    assert_eq!(reread, config);
    assert_eq!(reread.extra["devtool"], json!(false));
  }

  #[test]
  fn read_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("host.json");
    fs::write(&path, "{").unwrap();
    assert!(matches!(read_host_config(&path), Err(HookError::Parse { .. })));
  }
}
