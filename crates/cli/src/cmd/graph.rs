//! Implementation of the `packline graph` command.

use std::path::Path;

use anyhow::{Context, Result};

use packline_lib::driver::{BuildOptions, resolve_graph};
use packline_lib::util::format_bytes;

use crate::output::{OutputFormat, print_json, print_warning};

pub fn cmd_graph(config: Option<&Path>, format: OutputFormat) -> Result<()> {
  let config = super::load_config(config)?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let graph = rt
    .block_on(resolve_graph(&config, &BuildOptions::default()))
    .context("Failed to resolve module graph")?;
  let summary = graph.summary(&config.root);

  if format.is_json() {
    return print_json(&summary);
  }

  println!("Entry: {}", summary.entry);
  for module in &summary.modules {
    println!(
      "{} ({}, {}, {})",
      module.path,
      format!("{:?}", module.kind).to_lowercase(),
      format!("{:?}", module.syntax).to_lowercase(),
      format_bytes(module.bytes as u64)
    );
    for import in &module.imports {
      println!("  {} -> {}", import.specifier, import.target);
    }
  }
  if !summary.externals.is_empty() {
    println!("Externals: {}", summary.externals.join(", "));
  }
  if !summary.builtins.is_empty() {
    println!("Builtins: {}", summary.builtins.join(", "));
  }
  for cycle in &summary.cycles {
    print_warning(&format!("Import cycle: {}", cycle.join(" -> ")));
  }
  Ok(())
}
