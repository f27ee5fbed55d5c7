//! Node-style module resolution.
//!
//! Relative and absolute specifiers are looked up as files, then with each
//! extension, then as directories with an `index` file. Bare specifiers are
//! host built-ins or packages found in `node_modules` directories walking
//! up from the importer.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::trace;

use crate::graph::{ImportTarget, ModuleId};
use crate::stage::{Capability, GraphStage, ResolveRequest, Stage, StageContext, StageError, parse_options};

pub const NAME: &str = "resolve";

/// Extensions tried, in order, when a specifier has none that matches.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".mjs", ".js", ".cjs", ".jsx", ".ts", ".tsx", ".json"];

/// Modules the Node runtime provides.
const NODE_BUILTINS: &[&str] = &[
  "assert",
  "async_hooks",
  "buffer",
  "child_process",
  "cluster",
  "console",
  "constants",
  "crypto",
  "dgram",
  "diagnostics_channel",
  "dns",
  "domain",
  "events",
  "fs",
  "http",
  "http2",
  "https",
  "inspector",
  "module",
  "net",
  "os",
  "path",
  "perf_hooks",
  "process",
  "punycode",
  "querystring",
  "readline",
  "repl",
  "stream",
  "string_decoder",
  "sys",
  "timers",
  "tls",
  "trace_events",
  "tty",
  "url",
  "util",
  "v8",
  "vm",
  "wasi",
  "worker_threads",
  "zlib",
];

/// Whether `specifier` names a Node built-in (`fs`, `fs/promises`, `node:test`).
pub fn is_builtin(specifier: &str) -> bool {
  if specifier.starts_with("node:") {
    return true;
  }
  let head = specifier.split('/').next().unwrap_or(specifier);
  NODE_BUILTINS.contains(&head)
}

/// Find the file a path refers to: the path itself, the path with each
/// extension appended, or an `index` file inside it.
pub fn find_file<S: AsRef<str>>(candidate: &Path, extensions: &[S]) -> Option<PathBuf> {
  let found = if candidate.is_file() {
    Some(candidate.to_path_buf())
  } else {
    with_extensions(candidate, extensions).or_else(|| with_extensions(&candidate.join("index"), extensions))
  }?;
  Some(dunce::canonicalize(&found).unwrap_or(found))
}

fn with_extensions<S: AsRef<str>>(base: &Path, extensions: &[S]) -> Option<PathBuf> {
  extensions.iter().find_map(|ext| {
    let mut path = base.as_os_str().to_os_string();
    path.push(ext.as_ref());
    let path = PathBuf::from(path);
    path.is_file().then_some(path)
  })
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Options {
  extensions: Vec<String>,
  prefer_builtins: bool,
  browser: bool,
  jsnext: bool,
  main_fields: Vec<String>,
  module_directories: Vec<String>,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
      prefer_builtins: true,
      browser: false,
      jsnext: false,
      main_fields: vec!["module".to_string(), "main".to_string()],
      module_directories: vec!["node_modules".to_string()],
    }
  }
}

#[derive(Debug)]
pub struct Resolve {
  options: Options,
}

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  Ok(Stage::Graph(Box::new(Resolve::from_options(options)?)))
}

impl Resolve {
  pub fn from_options(options: &serde_json::Value) -> Result<Self, StageError> {
    let options: Options = parse_options(NAME, options)?;
    if let Some(bad) = options.extensions.iter().find(|e| !e.starts_with('.')) {
      return Err(StageError::invalid_option(
        NAME,
        "extensions",
        format!("'{}' must start with a dot", bad),
      ));
    }
    if options.module_directories.iter().any(|d| d.is_empty()) {
      return Err(StageError::invalid_option(NAME, "module_directories", "entries must not be empty"));
    }
    Ok(Self { options })
  }

  /// Resolve a specifier imported from `importer`.
  pub fn resolve_specifier(&self, specifier: &str, importer: &ModuleId) -> Option<ImportTarget> {
    let base = importer.path().parent().unwrap_or_else(|| Path::new("/"));

    if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
      return find_file(&base.join(specifier), &self.options.extensions).map(|p| ImportTarget::Module(ModuleId::new(p)));
    }
    if Path::new(specifier).is_absolute() {
      return find_file(Path::new(specifier), &self.options.extensions)
        .map(|p| ImportTarget::Module(ModuleId::new(p)));
    }

    let builtin = is_builtin(specifier);
    if builtin && self.options.prefer_builtins {
      return Some(ImportTarget::Builtin(specifier.to_string()));
    }
    if let Some(found) = self.find_package(specifier, base) {
      return Some(ImportTarget::Module(ModuleId::new(found)));
    }
    builtin.then(|| ImportTarget::Builtin(specifier.to_string()))
  }

  fn find_package(&self, specifier: &str, from: &Path) -> Option<PathBuf> {
    let (name, subpath) = split_package(specifier)?;
    for dir in from.ancestors() {
      for modules in &self.options.module_directories {
        let package_dir = dir.join(modules).join(name);
        trace!(candidate = %package_dir.display(), "probing package");
        let found = match subpath {
          Some(sub) => find_file(&package_dir.join(sub), &self.options.extensions),
          None => self.package_entry(&package_dir),
        };
        if found.is_some() {
          return found;
        }
      }
    }
    None
  }

  /// The entry file of a package directory (or a single-file package).
  fn package_entry(&self, package_dir: &Path) -> Option<PathBuf> {
    if !package_dir.is_dir() {
      return with_extensions(package_dir, &self.options.extensions).map(|p| dunce::canonicalize(&p).unwrap_or(p));
    }

    let manifest: serde_json::Value = std::fs::read_to_string(package_dir.join("package.json"))
      .ok()
      .and_then(|text| serde_json::from_str(&text).ok())
      .unwrap_or(serde_json::Value::Null);

    let mut fields: Vec<&str> = Vec::new();
    if self.options.browser {
      fields.push("browser");
    }
    if self.options.jsnext {
      fields.push("jsnext:main");
    }
    fields.extend(self.options.main_fields.iter().map(String::as_str));

    fields
      .into_iter()
      .filter_map(|field| manifest.get(field).and_then(|v| v.as_str()))
      .find_map(|main| find_file(&package_dir.join(main), &self.options.extensions))
      .or_else(|| find_file(&package_dir.join("index"), &self.options.extensions))
  }
}

/// Split `@scope/name/sub/path` into `("@scope/name", Some("sub/path"))`.
fn split_package(specifier: &str) -> Option<(&str, Option<&str>)> {
  let mut slashes = specifier.match_indices('/').map(|(i, _)| i);
  let end = if specifier.starts_with('@') {
    slashes.nth(1)
  } else {
    slashes.next()
  };
  match end {
    Some(i) => Some((&specifier[..i], Some(&specifier[i + 1..]).filter(|s| !s.is_empty()))),
    None if !specifier.is_empty() && specifier != "@" => Some((specifier, None)),
    None => None,
  }
}

impl GraphStage for Resolve {
  fn name(&self) -> &str {
    NAME
  }

  fn provides(&self) -> &[Capability] {
    &[Capability::Resolution]
  }

  fn resolve(&self, request: &ResolveRequest<'_>, _ctx: &StageContext) -> Result<Option<ImportTarget>, StageError> {
    Ok(self.resolve_specifier(request.specifier, request.importer))
  }
}
