//! Raw and gzip size of each artifact.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;

use crate::driver::OutputArtifact;
use crate::stage::{Diagnostic, GraphStage, Stage, StageContext, StageError, parse_options};
use crate::util::format_bytes;

pub const NAME: &str = "filesize";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Options {
  gzip: bool,
}

impl Default for Options {
  fn default() -> Self {
    Self { gzip: true }
  }
}

#[derive(Debug)]
pub struct Filesize {
  gzip: bool,
}

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  let options: Options = parse_options(NAME, options)?;
  Ok(Stage::Graph(Box::new(Filesize { gzip: options.gzip })))
}

/// Size of `bytes` after gzip at the default level.
pub fn gzip_size(bytes: &[u8]) -> std::io::Result<u64> {
  let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
  encoder.write_all(bytes)?;
  Ok(encoder.finish()?.len() as u64)
}

impl GraphStage for Filesize {
  fn name(&self) -> &str {
    NAME
  }

  fn report(&self, artifact: &OutputArtifact, ctx: &StageContext) -> Option<Diagnostic> {
    let mut message = format!(
      "{}: {}",
      artifact.relative_file(ctx.root()),
      format_bytes(artifact.content.len() as u64)
    );
    if self.gzip
      && let Ok(gzipped) = gzip_size(&artifact.content)
    {
      message.push_str(&format!(" (gzip {})", format_bytes(gzipped)));
    }
    Some(Diagnostic {
      stage: NAME.to_string(),
      file: artifact.file.clone(),
      message,
    })
  }
}
