//! Implementation of the `packline check` command.
//!
//! Validates the configuration and builds the pipeline, which parses every
//! stage's options and checks the stage order, without reading any module.

use std::path::Path;

use anyhow::{Context, Result};

use packline_lib::stage::{Pipeline, StageRegistry};

use crate::output::{print_stat, print_success};

pub fn cmd_check(config: Option<&Path>) -> Result<()> {
  let config = super::load_config(config)?;
  config.validate().context("Invalid configuration")?;
  let pipeline = Pipeline::from_config(&config, &StageRegistry::builtin()).context("Invalid pipeline")?;

  print_success("Configuration is valid");
  print_stat("entry", &config.entry);
  print_stat("stages", &pipeline.names().join(" -> "));
  let outputs: Vec<String> = config
    .outputs
    .iter()
    .map(|o| format!("{} ({})", o.file.display(), o.format))
    .collect();
  print_stat("outputs", &outputs.join(", "));
  if !config.externals.is_empty() {
    print_stat("externals", &config.externals.join(", "));
  }
  Ok(())
}
