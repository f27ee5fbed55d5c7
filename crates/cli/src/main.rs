mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use packline_lib::hook::{DEFAULT_TEST, RAW_LOADER};

use crate::output::OutputFormat;

/// packline - ordered asset-transform pipeline for JavaScript bundles
#[derive(Parser)]
#[command(name = "packline")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the pipeline and write its artifacts
  Build {
    /// Pipeline configuration (default: $PACKLINE_CONFIG or packline.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render everything but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Maximum concurrent file reads
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Validate the configuration and stage order without building
  Check {
    #[arg(short, long)]
    config: Option<PathBuf>,
  },

  /// Print the module graph after every stage ran
  Graph {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Append an asset rule to a development-server configuration
  Hook {
    /// Host configuration JSON file
    host_config: PathBuf,

    /// Regular expression for the files to intercept
    #[arg(long, default_value = DEFAULT_TEST)]
    test: String,

    /// Loader to route matching files through
    #[arg(long, default_value = RAW_LOADER)]
    loader: String,

    /// Print the result instead of writing the file back
    #[arg(long)]
    stdout: bool,
  },

  /// Show version, stages and configuration lookup
  Info,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build {
      config,
      dry_run,
      jobs,
      format,
    } => cmd::cmd_build(config.as_deref(), dry_run, jobs, format),
    Commands::Check { config } => cmd::cmd_check(config.as_deref()),
    Commands::Graph { config, format } => cmd::cmd_graph(config.as_deref(), format),
    Commands::Hook {
      host_config,
      test,
      loader,
      stdout,
    } => cmd::cmd_hook(&host_config, &test, &loader, stdout),
    Commands::Info => {
      cmd::cmd_info();
      Ok(())
    }
  }
}
