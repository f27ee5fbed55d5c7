use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::js::{self, ParseError};

use super::scan::scan_imports;

/// A module identified by its absolute, canonical path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(PathBuf);

impl ModuleId {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self(path.into())
  }

  pub fn path(&self) -> &Path {
    &self.0
  }

  /// File extension including the leading dot, e.g. `.css`.
  pub fn extension(&self) -> Option<String> {
    self.0.extension().and_then(|e| e.to_str()).map(|e| format!(".{}", e))
  }

  /// Path relative to `root` with forward slashes, or the full path when the
  /// module lives outside of `root`.
  pub fn relative_to(&self, root: &Path) -> String {
    match self.0.strip_prefix(root) {
      Ok(relative) => relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"),
      Err(_) => self.0.to_string_lossy().replace('\\', "/"),
    }
  }
}

impl std::fmt::Display for ModuleId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.display())
  }
}

/// How a module's file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
  /// Executable JavaScript (or TypeScript, passed through untouched).
  Script,
  /// A JSON document waiting for the `json` stage.
  Json,
  /// Any other file; some stage must turn it into a script.
  Asset,
}

const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts"];

impl ModuleKind {
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some(ext) if SCRIPT_EXTENSIONS.contains(&ext) => ModuleKind::Script,
      Some("json") => ModuleKind::Json,
      _ => ModuleKind::Asset,
    }
  }
}

/// Module system a script is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
  Esm,
  CommonJs,
  /// Not a script.
  Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
  /// `import ... from "x"` or `import "x"`.
  Static,
  /// `export ... from "x"`.
  ReExport,
  /// `import("x")`.
  Dynamic,
  /// `require("x")`.
  Require,
}

/// What an import specifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ImportTarget {
  /// Not resolved yet.
  Pending,
  /// A module bundled into the artifact.
  Module(ModuleId),
  /// A declared external, loaded by the host at runtime.
  External(String),
  /// A host built-in module (`fs`, `node:path`, ...).
  Builtin(String),
}

impl ImportTarget {
  /// The name the host must supply, for externals and built-ins.
  pub fn host_name(&self) -> Option<&str> {
    match self {
      ImportTarget::External(name) | ImportTarget::Builtin(name) => Some(name),
      _ => None,
    }
  }

  pub fn module(&self) -> Option<&ModuleId> {
    match self {
      ImportTarget::Module(id) => Some(id),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
  pub specifier: String,
  pub kind: ImportKind,
  pub target: ImportTarget,
}

/// One source module in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
  pub id: ModuleId,
  /// File contents as read from disk, before any stage ran.
  pub original: String,
  /// Current source text.
  pub source: String,
  pub kind: ModuleKind,
  pub syntax: Syntax,
  /// Imports in order of first appearance.
  pub imports: Vec<Import>,
}

impl Module {
  /// Create a module from its file contents and the text produced by the
  /// text stages, scanning imports for scripts.
  ///
  /// # Errors
  ///
  /// Returns the parse error of a script that is not valid JavaScript.
  pub fn new(id: ModuleId, original: String, source: String) -> Result<Self, ParseError> {
    let kind = ModuleKind::from_path(id.path());
    let (syntax, imports) = match kind {
      ModuleKind::Script => {
        let parsed = js::parse(&source, id.path())?;
        let syntax = if parsed.is_esm() { Syntax::Esm } else { Syntax::CommonJs };
        let imports = scan_imports(&parsed)
          .into_iter()
          .map(|(specifier, kind)| Import {
            specifier,
            kind,
            target: ImportTarget::Pending,
          })
          .collect();
        (syntax, imports)
      }
      _ => (Syntax::Raw, Vec::new()),
    };

    Ok(Self {
      id,
      original,
      source,
      kind,
      syntax,
      imports,
    })
  }

  /// Replace the source of a module that has been converted into a CommonJS script.
  pub fn set_commonjs_source(&mut self, source: String) {
    self.source = source;
    self.kind = ModuleKind::Script;
    self.syntax = Syntax::CommonJs;
  }

  pub fn target_of(&self, specifier: &str) -> Option<&ImportTarget> {
    self.imports.iter().find(|i| i.specifier == specifier).map(|i| &i.target)
  }
}
