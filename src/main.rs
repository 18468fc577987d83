//! basanos - hierarchical acceptance-test runner
//!
//! Runs suites declared as directory trees of `context.yaml` files and
//! reports the results through the configured sinks.

use std::path::PathBuf;

use basanos::cli::{self, GlobalArgs};
use basanos::commands::Commands;
use basanos::common::logging;
use clap::Parser;

#[derive(Parser)]
#[command(name = "basanos", about = "Hierarchical YAML acceptance-test runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output: tree reporter and debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    let global = GlobalArgs {
        config: cli.config,
        verbose: cli.verbose,
    };

    match cli::dispatch(cli.command, &global).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
