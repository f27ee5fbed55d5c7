//! Import scanning and import-site rewriting.
//!
//! Both walk the parsed syntax tree, so imports inside comments, strings,
//! templates and regular expressions are never mistaken for real ones.

use std::collections::HashSet;
use std::path::Path;

use swc_ecma_ast::{ImportDecl, ImportSpecifier, ModuleDecl, ModuleItem, NamedExport};

use crate::js::{self, CallKind, Edits, Parsed};

use super::module::ImportKind;

/// Collect import specifiers in order of first appearance.
///
/// A specifier used with two different import kinds is listed once per kind.
/// Type-only imports and re-exports are skipped.
pub fn scan_imports(parsed: &Parsed) -> Vec<(String, ImportKind)> {
  let mut found = Vec::new();
  for item in &parsed.module.body {
    let ModuleItem::ModuleDecl(decl) = item else {
      continue;
    };
    match decl {
      ModuleDecl::Import(import) if has_runtime_bindings(import) => {
        found.push((import.span.lo, import.src.value.to_string(), ImportKind::Static));
      }
      ModuleDecl::ExportAll(export) if !export.type_only => {
        found.push((export.span.lo, export.src.value.to_string(), ImportKind::ReExport));
      }
      ModuleDecl::ExportNamed(NamedExport {
        span,
        src: Some(src),
        type_only: false,
        ..
      }) => {
        found.push((span.lo, src.value.to_string(), ImportKind::ReExport));
      }
      _ => {}
    }
  }

  for call in parsed.import_calls() {
    let Some(specifier) = call.specifier else {
      continue;
    };
    let kind = match call.kind {
      CallKind::Require => ImportKind::Require,
      CallKind::Dynamic => ImportKind::Dynamic,
    };
    found.push((call.span.lo, specifier, kind));
  }
  found.sort_by_key(|(pos, _, _)| *pos);

  let mut seen = HashSet::new();
  found
    .into_iter()
    .filter(|(_, specifier, kind)| seen.insert((specifier.clone(), *kind)))
    .map(|(_, specifier, kind)| (specifier, kind))
    .collect()
}

/// False for `import type` and for imports whose named bindings are all types.
pub fn has_runtime_bindings(import: &ImportDecl) -> bool {
  if import.type_only {
    return false;
  }
  import.specifiers.is_empty()
    || import
      .specifiers
      .iter()
      .any(|s| !matches!(s, ImportSpecifier::Named(named) if named.is_type_only))
}

/// An import site that cannot be replaced by a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot inline '{specifier}': {reason}")]
pub struct UnsupportedImport {
  pub specifier: String,
  pub reason: String,
}

/// Replace every import of `specifier` with the JavaScript expression `value`.
///
/// Handles default, namespace and side-effect imports, `require()` calls and
/// dynamic `import()`. Named imports and re-exports have no value to bind and
/// are rejected.
pub fn inline_import(source: &str, path: &Path, specifier: &str, value: &str) -> Result<String, UnsupportedImport> {
  let unsupported = |reason: String| UnsupportedImport {
    specifier: specifier.to_string(),
    reason,
  };
  let parsed = js::parse(source, path).map_err(|e| unsupported(e.to_string()))?;

  let mut edits = Edits::default();
  for item in &parsed.module.body {
    let ModuleItem::ModuleDecl(decl) = item else {
      continue;
    };
    match decl {
      ModuleDecl::Import(import) if &*import.src.value == specifier => {
        let text = match import.specifiers.as_slice() {
          _ if import.type_only => String::new(),
          [] => String::new(),
          [ImportSpecifier::Default(default)] => format!("const {} = {};", default.local.sym, value),
          [ImportSpecifier::Namespace(ns)] => format!("const {} = {{ default: {} }};", ns.local.sym, value),
          _ => return Err(unsupported("named imports have no value to bind".to_string())),
        };
        edits.replace(js::with_semicolon(source, parsed.range(import.span)), text);
      }
      ModuleDecl::ExportAll(export) if &*export.src.value == specifier => {
        return Err(unsupported("re-exports have no value to bind".to_string()));
      }
      ModuleDecl::ExportNamed(NamedExport { src: Some(src), .. }) if &*src.value == specifier => {
        return Err(unsupported("re-exports have no value to bind".to_string()));
      }
      _ => {}
    }
  }

  for call in parsed.import_calls() {
    if call.specifier.as_deref() != Some(specifier) {
      continue;
    }
    let text = match call.kind {
      CallKind::Require => value.to_string(),
      CallKind::Dynamic => format!("Promise.resolve({{ default: {} }})", value),
    };
    edits.replace(parsed.range(call.span), text);
  }
  Ok(edits.apply(source))
}
