//! Minified printing of CommonJS scripts.
//!
//! Scripts are parsed and printed back without comments or optional
//! whitespace.

use serde::Deserialize;
use tracing::debug;

use crate::graph::{ModuleGraph, ModuleKind};
use crate::js;
use crate::stage::{Capability, GraphStage, Stage, StageContext, StageError, parse_options};

pub const NAME: &str = "minify";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Options {}

#[derive(Debug)]
pub struct Minify;

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  let _: Options = parse_options(NAME, options)?;
  Ok(Stage::Graph(Box::new(Minify)))
}

impl GraphStage for Minify {
  fn name(&self) -> &str {
    NAME
  }

  fn requires(&self) -> &[Capability] {
    &[Capability::CommonJs]
  }

  fn provides(&self) -> &[Capability] {
    &[Capability::Minified]
  }

  fn transform(&self, mut graph: ModuleGraph, _ctx: &StageContext) -> Result<ModuleGraph, StageError> {
    for module in graph.modules_mut().filter(|m| m.kind == ModuleKind::Script) {
      let parsed = js::parse(&module.source, module.id.path())
        .map_err(|e| StageError::invalid_syntax(NAME, e.to_string()).in_module(&module.id))?;
      if let Some(line) = parsed.first_declaration_line() {
        return Err(
          StageError::unsupported(
            NAME,
            format!("cannot print import/export syntax on line {}; convert the module first", line),
          )
          .in_module(&module.id),
        );
      }

      let before = module.source.len();
      module.source = js::minify(&parsed).map_err(|e| StageError::new(NAME, e.into()).in_module(&module.id))?;
      debug!(module = %module.id, before, after = module.source.len(), "minified module");
    }
    Ok(graph)
  }
}
