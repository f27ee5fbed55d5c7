//! Implementation of the `packline hook` command.

use std::path::Path;

use anyhow::{Context, Result};

use packline_lib::hook::{AssetHook, read_host_config, to_json, write_host_config};

use crate::output::print_success;

pub fn cmd_hook(host_config: &Path, test: &str, loader: &str, stdout: bool) -> Result<()> {
  let hook = AssetHook::new(test, loader).context("Invalid asset rule")?;
  let config = read_host_config(host_config)?;
  let config = hook.apply(config);

  if stdout {
    print!("{}", to_json(&config));
    return Ok(());
  }

  write_host_config(host_config, &config)?;
  print_success(&format!(
    "Added rule {} -> {} to {}",
    test,
    loader,
    host_config.display()
  ));
  Ok(())
}
