//! Test utilities for packline-lib.
//!
//! Helpers that lay out small projects on disk for driver and stage tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::graph::{Module, ModuleGraph, ModuleId};

/// A throwaway project directory.
pub struct Project {
  pub temp: TempDir,
}

impl Project {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Canonical project root.
  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// Write a file relative to the project root, creating parent directories.
  pub fn write(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.root().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.root().join(relative_path)
  }
}

/// Build a module whose imports are already resolved to sibling paths under `root`.
pub fn module_at(root: &Path, relative_path: &str, source: &str) -> Module {
  Module::new(ModuleId::new(root.join(relative_path)), source.to_string(), source.to_string()).unwrap()
}

/// Build a graph from `(path, source)` pairs; the first pair is the entry.
///
/// Relative specifiers are resolved against the importer's directory without
/// touching the filesystem.
pub fn graph_of(root: &Path, modules: &[(&str, &str)]) -> ModuleGraph {
  let entry = ModuleId::new(root.join(modules[0].0));
  let mut graph = ModuleGraph::new(entry);
  for (path, source) in modules {
    let mut module = module_at(root, path, source);
    let dir = module.id.path().parent().unwrap().to_path_buf();
    for import in &mut module.imports {
      if import.specifier.starts_with('.') {
        let target = normalize(&dir.join(&import.specifier));
        import.target = crate::graph::ImportTarget::Module(ModuleId::new(target));
      } else {
        import.target = crate::graph::ImportTarget::External(import.specifier.clone());
      }
    }
    graph.insert(module);
  }
  graph.relink();
  graph
}

fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      std::path::Component::CurDir => {}
      std::path::Component::ParentDir => {
        out.pop();
      }
      other => out.push(other),
    }
  }
  out
}
