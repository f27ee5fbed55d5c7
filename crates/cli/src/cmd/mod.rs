mod build;
mod check;
mod graph;
mod hook;
mod info;

use std::path::Path;

use anyhow::{Context, Result};

use packline_lib::config::{PipelineConfig, default_config_path};

pub use build::cmd_build;
pub use check::cmd_check;
pub use graph::cmd_graph;
pub use hook::cmd_hook;
pub use info::cmd_info;

/// Load the pipeline config from `path`, or from the default location.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
  let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
  PipelineConfig::load(&path).with_context(|| format!("Failed to load config: {}", path.display()))
}
