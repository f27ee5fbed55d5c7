//! Data assets inlined as string literals.
//!
//! Every import of a matching module is replaced in its importer by a string
//! literal holding the module's full text. The asset then has no importers
//! and leaves the graph, unless it is the entry, in which case it becomes a
//! module exporting the string.

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::graph::scan::inline_import;
use crate::graph::{ModuleGraph, ModuleId};
use crate::js;
use crate::stage::{GraphStage, Stage, StageContext, StageError, parse_options};

use super::{compile, match_path};

pub const NAME: &str = "string";

const DEFAULT_INCLUDE: &str = r"\.css$";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Options {
  include: String,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      include: DEFAULT_INCLUDE.to_string(),
    }
  }
}

#[derive(Debug)]
pub struct StringAssets {
  include: Regex,
}

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  Ok(Stage::Graph(Box::new(StringAssets::from_options(options)?)))
}

impl StringAssets {
  pub fn from_options(options: &serde_json::Value) -> Result<Self, StageError> {
    let options: Options = parse_options(NAME, options)?;
    Ok(Self {
      include: compile(NAME, "include", &options.include)?,
    })
  }

  fn inline(&self, graph: &mut ModuleGraph, asset: &ModuleId) -> Result<(), StageError> {
    let Some(literal) = graph.get(asset).map(|m| js::string_literal(&m.source)) else {
      return Ok(());
    };

    for importer in graph.importers(asset) {
      let Some(module) = graph.get_mut(&importer) else {
        continue;
      };
      let specifiers: Vec<String> = module
        .imports
        .iter()
        .filter(|i| i.target.module() == Some(asset))
        .map(|i| i.specifier.clone())
        .collect();

      let mut source = module.source.clone();
      for specifier in &specifiers {
        source = inline_import(&source, importer.path(), specifier, &literal)
          .map_err(|e| StageError::unsupported(NAME, e.to_string()).in_module(&importer))?;
      }
      module.source = source;
      module.imports.retain(|i| i.target.module() != Some(asset));
      debug!(asset = %asset, importer = %importer, "inlined asset");
    }

    if graph.entry() == asset {
      if let Some(module) = graph.get_mut(asset) {
        module.set_commonjs_source(format!("module.exports = {};\n", literal));
      }
    } else {
      graph.remove(asset);
    }
    Ok(())
  }
}

impl GraphStage for StringAssets {
  fn name(&self) -> &str {
    NAME
  }

  fn transform(&self, mut graph: ModuleGraph, _ctx: &StageContext) -> Result<ModuleGraph, StageError> {
    let assets: Vec<ModuleId> = graph
      .modules()
      .filter(|m| self.include.is_match(&match_path(m.id.path())))
      .map(|m| m.id.clone())
      .collect();

    for asset in &assets {
      self.inline(&mut graph, asset)?;
    }
    graph.relink();
    Ok(graph)
  }
}
