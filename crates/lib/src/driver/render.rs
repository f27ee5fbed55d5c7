//! Rendering a module graph into one artifact.
//!
//! Every module reachable from the entry becomes a wrapper function in a
//! table keyed by its root-relative path, next to the specifier map its
//! `require` calls go through. A small runtime caches module instances so
//! that cycles see partially initialized exports, the way Node does.
//!
//! Host modules (externals and built-ins) are loaded with the host `require`
//! in `cjs` artifacts and read from globals in `iife` artifacts.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::config::{OutputDescriptor, OutputFormat, PipelineConfig};
use crate::consts::{RENDER_STAGE, SOURCEMAP_SUFFIX};
use crate::graph::{ImportTarget, Module, ModuleGraph, ModuleKind, Syntax};
use crate::js;
use crate::stage::StageError;
use crate::stage::stages::commonjs::{EXPORT_HELPER, EXPORT_STAR_HELPER, IMPORT_DEFAULT_HELPER, uses_helper};
use crate::util::hash::hash_bytes;

use super::sourcemap::SourceMapBuilder;
use super::types::{ModuleContribution, OutputArtifact};

const IMPORT_DEFAULT_RUNTIME: &str =
  "function __importDefault(mod) { return mod && mod.__esModule ? mod.default : mod; }";

const EXPORT_STAR_RUNTIME: &str = "function __exportStar(from, to) { Object.keys(from).forEach(function (key) { \
if (key !== \"default\" && !Object.prototype.hasOwnProperty.call(to, key)) \
Object.defineProperty(to, key, { enumerable: true, get: function () { return from[key]; } }); }); }";

const EXPORT_RUNTIME: &str = "function __export(target, getters) { Object.keys(getters).forEach(function (name) { \
Object.defineProperty(target, name, { enumerable: true, get: getters[name] }); }); }";

const REQUIRE_RUNTIME: &[&str] = &[
  "var __cache = {};",
  "function __host(specifier) {",
  "  if (!Object.prototype.hasOwnProperty.call(__externals, specifier)) throw new Error(\"Cannot find module '\" + specifier + \"'\");",
  "  return __externals[specifier]();",
  "}",
  "function __require(key) {",
  "  var cached = __cache[key];",
  "  if (cached) return cached.exports;",
  "  var entry = __modules[key];",
  "  if (!entry) throw new Error(\"Cannot find module '\" + key + \"'\");",
  "  var module = __cache[key] = { exports: {} };",
  "  entry[0].call(module.exports, module, module.exports, function (specifier) {",
  "    var deps = entry[1];",
  "    return Object.prototype.hasOwnProperty.call(deps, specifier) ? __require(deps[specifier]) : __host(specifier);",
  "  });",
  "  return module.exports;",
  "}",
];

/// Output text plus the line mappings that go with it.
struct Writer {
  lines: Vec<String>,
  map: Option<SourceMapBuilder>,
}

impl Writer {
  fn line(&mut self, text: impl Into<String>) {
    self.lines.push(text.into());
    if let Some(map) = &mut self.map {
      map.push_line(None);
    }
  }

  fn mapped(&mut self, text: &str, mapping: Option<(usize, usize)>) {
    self.lines.push(text.to_string());
    if let Some(map) = &mut self.map {
      map.push_line(mapping);
    }
  }
}

fn render_error(message: String, module: &Module) -> StageError {
  StageError::unsupported(RENDER_STAGE, message).in_module(&module.id)
}

/// Check that a module can be wrapped as is.
fn check_renderable(module: &Module, root: &Path) -> Result<(), StageError> {
  let path = module.id.relative_to(root);
  match module.kind {
    ModuleKind::Json => Err(render_error(
      format!("JSON module {} was not converted; add the json stage", path),
      module,
    )),
    ModuleKind::Asset => Err(render_error(
      format!("asset {} was not converted into a script by any stage", path),
      module,
    )),
    ModuleKind::Script if module.syntax == Syntax::Esm => Err(render_error(
      format!("{} still uses ES module syntax; add the commonjs stage", path),
      module,
    )),
    ModuleKind::Script => Ok(()),
  }
}

/// Host specifiers a format must supply, mapped to the loader expression.
fn host_loaders(
  modules: &[&Module],
  output: &OutputDescriptor,
  config: &PipelineConfig,
) -> Result<BTreeMap<String, String>, StageError> {
  let mut loaders = BTreeMap::new();
  for module in modules {
    for import in &module.imports {
      let Some(name) = import.target.host_name() else {
        continue;
      };
      let loader = match output.format {
        OutputFormat::Cjs => format!("require({})", js::string_literal(name)),
        OutputFormat::Iife => match config.globals.get(name) {
          Some(global) => global.clone(),
          None => {
            return Err(render_error(
              format!("no global variable is configured for '{}' in an iife output", name),
              module,
            ));
          }
        },
      };
      loaders.insert(import.specifier.clone(), loader);
    }
  }
  Ok(loaders)
}

/// Render `graph` into the artifact `output` describes.
///
/// # Errors
///
/// Fails with a stage error named `render` when a reachable module is not a
/// CommonJS script, an import points at a module that is no longer in the
/// graph, or an `iife` output has no global for a host module.
pub fn render(graph: &ModuleGraph, output: &OutputDescriptor, config: &PipelineConfig) -> Result<OutputArtifact, StageError> {
  let root = config.root.as_path();
  let file = config.output_path(output);
  let order = graph.render_order();

  let mut modules = Vec::with_capacity(order.len());
  for id in &order {
    if let Some(module) = graph.get(id) {
      check_renderable(module, root)?;
      modules.push(module);
    }
  }

  let loaders = host_loaders(&modules, output, config)?;

  let mut writer = Writer {
    lines: Vec::new(),
    map: output.sourcemap.then(SourceMapBuilder::new),
  };

  if output.format == OutputFormat::Iife {
    let name = output.name.as_deref().unwrap_or_default();
    writer.line(format!("var {} = (function () {{", name));
  }
  writer.line("'use strict';");

  let helpers = [
    (IMPORT_DEFAULT_HELPER, IMPORT_DEFAULT_RUNTIME),
    (EXPORT_STAR_HELPER, EXPORT_STAR_RUNTIME),
    (EXPORT_HELPER, EXPORT_RUNTIME),
  ];
  for (helper, runtime) in helpers {
    if modules.iter().any(|m| uses_helper(&m.source, helper)) {
      writer.line(runtime);
    }
  }

  writer.line("var __externals = {");
  for (specifier, loader) in &loaders {
    writer.line(format!(
      "  {}: function () {{ return {}; }},",
      js::string_literal(specifier),
      loader
    ));
  }
  writer.line("};");

  writer.line("var __modules = {");
  let mut contributions = Vec::with_capacity(modules.len());
  for module in &modules {
    let key = module.id.relative_to(root);
    let deps = module_dependencies(graph, module, root)?;

    writer.line(format!(
      "{}: [function (module, exports, require) {{",
      js::string_literal(&key)
    ));

    let source_index = writer
      .map
      .as_mut()
      .map(|map| map.add_source(key.clone(), module.original.clone()));
    // Lines map one to one only while every stage kept them in place;
    // otherwise only the start of the module is mapped.
    let keeps_lines = module.source.lines().count() == module.original.lines().count();
    for (index, line) in module.source.lines().enumerate() {
      let mapping = source_index.and_then(|source| match keeps_lines {
        true => Some((source, index)),
        false => (index == 0).then_some((source, 0)),
      });
      writer.mapped(line, mapping);
    }

    writer.line(format!("}}, {}],", deps));
    contributions.push(ModuleContribution {
      path: key,
      bytes: module.source.len(),
    });
  }
  writer.line("};");

  for line in REQUIRE_RUNTIME {
    writer.line(*line);
  }

  let entry = js::string_literal(&graph.entry().relative_to(root));
  match output.format {
    OutputFormat::Cjs => writer.line(format!("module.exports = __require({});", entry)),
    OutputFormat::Iife => {
      writer.line(format!("return __require({});", entry));
      writer.line("})();");
    }
  }

  let basename = file
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  let sourcemap = match &writer.map {
    Some(map) => {
      writer
        .lines
        .push(format!("//# sourceMappingURL={}{}", basename, SOURCEMAP_SUFFIX));
      Some(map.to_json(&basename))
    }
    None => None,
  };

  let mut text = writer.lines.join("\n");
  text.push('\n');
  let content = text.into_bytes();
  debug!(file = %file.display(), modules = contributions.len(), bytes = content.len(), "rendered artifact");

  Ok(OutputArtifact {
    format: output.format,
    digest: hash_bytes(&content),
    file,
    content,
    sourcemap,
    modules: contributions,
  })
}

/// The `{specifier: key}` table for a module's bundled imports.
fn module_dependencies(graph: &ModuleGraph, module: &Module, root: &Path) -> Result<String, StageError> {
  let mut deps: Vec<(String, String)> = Vec::new();
  for import in &module.imports {
    match &import.target {
      ImportTarget::Module(id) => {
        if !graph.contains(id) {
          return Err(render_error(
            format!("'{}' points at {}, which is not in the module graph", import.specifier, id),
            module,
          ));
        }
        if !deps.iter().any(|(specifier, _)| *specifier == import.specifier) {
          deps.push((import.specifier.clone(), id.relative_to(root)));
        }
      }
      ImportTarget::Pending => {
        return Err(render_error(
          format!("import '{}' was never resolved", import.specifier),
          module,
        ));
      }
      ImportTarget::External(_) | ImportTarget::Builtin(_) => {}
    }
  }

  let entries: Vec<String> = deps
    .iter()
    .map(|(specifier, key)| format!("{}: {}", js::string_literal(specifier), js::string_literal(key)))
    .collect();
  Ok(format!("{{{}}}", entries.join(", ")))
}
