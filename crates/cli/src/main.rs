mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hotfn_lib::consts::{DEFAULT_GATEWAY_PORT, DEFAULT_GATEWAY_PROGRAM, PROJECT_FILE};

use crate::cmd::LocalOptions;
use crate::output::print_error;

/// hotfn - local hot-reload engine for serverless functions
#[derive(Parser)]
#[command(name = "hotfn")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the project file
  #[arg(short, long, global = true, default_value = PROJECT_FILE)]
  config: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build all functions, start the gateway emulator and rebuild on change
  Local {
    /// Port the gateway emulator listens on
    #[arg(short, long, default_value_t = DEFAULT_GATEWAY_PORT)]
    port: u16,

    /// Quiet period after the last change before rebuilding (e.g. 800ms, 2s)
    #[arg(long, default_value = "800ms", value_parser = humantime::parse_duration)]
    debounce: Duration,

    /// Synthesized template (default: cdk.out/<service>-<stage>.template.json)
    #[arg(long)]
    template: Option<PathBuf>,

    /// Gateway emulator program
    #[arg(long, default_value = DEFAULT_GATEWAY_PROGRAM)]
    gateway_bin: String,
  },

  /// Run one build pass
  Build {
    /// Also install dependencies of interpreted functions
    #[arg(long)]
    all: bool,

    /// Build only this function
    #[arg(short, long)]
    function: Option<String>,
  },

  /// Show the resolved runtime of every function
  Detect {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Check the project file
  Validate,

  /// Check the host for required tools
  Doctor {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Local {
      port,
      debounce,
      template,
      gateway_bin,
    } => cmd::cmd_local(
      &cli.config,
      LocalOptions {
        port,
        debounce,
        template,
        gateway_bin,
      },
    ),
    Commands::Build { all, function } => cmd::cmd_build(&cli.config, all, function.as_deref()),
    Commands::Detect { json } => cmd::cmd_detect(&cli.config, json),
    Commands::Validate => cmd::cmd_validate(&cli.config, cli.verbose),
    Commands::Doctor { json } => cmd::cmd_doctor(json),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
