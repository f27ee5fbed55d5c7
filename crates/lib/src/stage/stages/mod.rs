//! Built-in stages.

pub mod alias;
pub mod commonjs;
pub mod filesize;
pub mod json;
pub mod minify;
pub mod polyfills;
pub mod replace;
pub mod resolve;
pub mod sizes;
pub mod string;

use std::path::Path;

use regex::Regex;

use super::StageError;

/// Compile a regex option, reporting a bad pattern against `key`.
fn compile(stage: &str, key: &str, pattern: &str) -> Result<Regex, StageError> {
  Regex::new(pattern).map_err(|e| StageError::invalid_option(stage, key, e.to_string()))
}

/// A path with forward slashes, for matching `include` patterns.
fn match_path(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}
