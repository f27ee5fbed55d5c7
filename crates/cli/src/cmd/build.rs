//! Implementation of the `packline build` command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use packline_lib::driver::{BuildOptions, build};
use packline_lib::util::format_bytes;

use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_success, print_warning};

pub fn cmd_build(config: Option<&Path>, dry_run: bool, jobs: Option<usize>, format: OutputFormat) -> Result<()> {
  let config = super::load_config(config)?;

  let mut options = BuildOptions {
    dry_run,
    ..Default::default()
  };
  if let Some(jobs) = jobs {
    options.parallelism = jobs.max(1);
  }

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(build(&config, &options)).context("Build failed")?;
  let elapsed = started.elapsed();
  info!(elapsed = %format_duration(elapsed), written = result.written, "build finished");

  if format.is_json() {
    return print_json(&result);
  }

  let verb = if result.written { "Built" } else { "Rendered" };
  print_success(&format!(
    "{} {} artifact(s) from {} module(s) in {}",
    verb,
    result.artifacts.len(),
    result.modules,
    format_duration(elapsed)
  ));
  for artifact in &result.artifacts {
    print_stat(
      &artifact.relative_file(&config.root),
      &format!(
        "{} ({}, {})",
        format_bytes(artifact.content.len() as u64),
        artifact.format,
        artifact.digest.short()
      ),
    );
  }
  if !result.externals.is_empty() {
    print_stat("externals", &result.externals.join(", "));
  }

  for cycle in &result.cycles {
    let members: Vec<String> = cycle.iter().map(|id| id.relative_to(&config.root)).collect();
    print_warning(&format!("Import cycle: {}", members.join(" -> ")));
  }
  for diagnostic in &result.diagnostics {
    println!("[{}] {}", diagnostic.stage, diagnostic.message);
  }
  if !result.written {
    print_info("Dry run: nothing was written");
  }

  Ok(())
}
