//! CLI command definitions
//!
//! Defines the clap commands for the basanos CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a suite
    Run {
        /// Suite root directory (default: `spec`, or `defaults.spec_dir`)
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Output sink: console, json, files[:DIR], junit[:FILE]
        /// Can be given multiple times: -o console -o junit:report.xml
        #[arg(long = "output", short = 'o')]
        outputs: Vec<String>,

        /// Only run scenarios whose path or name contains this text,
        /// or whose path matches it as a regular expression
        #[arg(long, short)]
        filter: Option<String>,

        /// Disable ANSI colors in the console reporter
        #[arg(long)]
        no_color: bool,
    },

    /// Load and validate a suite without running it
    Validate {
        /// Suite root directory
        #[arg(long)]
        spec: Option<PathBuf>,
    },
}
