//! Per-module size breakdown of each artifact.

use serde::Deserialize;

use crate::driver::OutputArtifact;
use crate::stage::{Diagnostic, GraphStage, Stage, StageContext, StageError, parse_options};
use crate::util::format_bytes;

pub const NAME: &str = "sizes";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Options {
  /// List each module's contribution, not just the total.
  details: bool,
}

impl Default for Options {
  fn default() -> Self {
    Self { details: true }
  }
}

#[derive(Debug)]
pub struct Sizes {
  details: bool,
}

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  let options: Options = parse_options(NAME, options)?;
  Ok(Stage::Graph(Box::new(Sizes {
    details: options.details,
  })))
}

impl GraphStage for Sizes {
  fn name(&self) -> &str {
    NAME
  }

  fn report(&self, artifact: &OutputArtifact, ctx: &StageContext) -> Option<Diagnostic> {
    let total = artifact.content.len() as u64;
    let mut message = format!(
      "{}: {} ({} modules)",
      artifact.relative_file(ctx.root()),
      format_bytes(total),
      artifact.modules.len()
    );

    if self.details {
      let mut modules = artifact.modules.clone();
      modules.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.path.cmp(&b.path)));
      for module in modules {
        let share = if total == 0 {
          0.0
        } else {
          module.bytes as f64 * 100.0 / total as f64
        };
        message.push_str(&format!(
          "\n  {} {} ({:.1}%)",
          module.path,
          format_bytes(module.bytes as u64),
          share
        ));
      }
    }

    Some(Diagnostic {
      stage: NAME.to_string(),
      file: artifact.file.clone(),
      message,
    })
  }
}
