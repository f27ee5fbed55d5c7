//! JSON modules as CommonJS.
//!
//! The document is validated and then exported verbatim: JSON text is a
//! JavaScript expression, so key order and number spelling are kept exactly
//! as written.

use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::debug;

use crate::graph::{ModuleGraph, ModuleKind};
use crate::stage::{GraphStage, Stage, StageContext, StageError, parse_options};

pub const NAME: &str = "json";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Options {}

#[derive(Debug)]
pub struct Json;

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  let _: Options = parse_options(NAME, options)?;
  Ok(Stage::Graph(Box::new(Json)))
}

impl GraphStage for Json {
  fn name(&self) -> &str {
    NAME
  }

  fn transform(&self, mut graph: ModuleGraph, _ctx: &StageContext) -> Result<ModuleGraph, StageError> {
    for module in graph.modules_mut().filter(|m| m.kind == ModuleKind::Json) {
      let document: Box<RawValue> = serde_json::from_str(&module.source)
        .map_err(|e| StageError::invalid_syntax(NAME, e.to_string()).in_module(&module.id))?;

      debug!(module = %module.id, "converted json module");
      module.set_commonjs_source(format!("module.exports = {};\n", document.get()));
    }
    Ok(graph)
  }
}
