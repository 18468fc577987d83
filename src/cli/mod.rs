//! CLI command handling
//!
//! Loads configuration and the suite, builds the requested sinks and drives
//! the engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Error, Result};
use crate::engine::{new_run_id, Engine, RunOptions};
use crate::sink::{ConsoleSink, FileSink, JsonSink, JunitSink, Sink, Sinks, Verbosity};
use crate::spec::{load_suite, LoadedSuite};

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Dispatch a CLI command, returning whether it succeeded
pub async fn dispatch(command: Commands, global: &GlobalArgs) -> Result<bool> {
    let config = Config::load(global.config.as_deref())?;

    match command {
        Commands::Run {
            spec,
            outputs,
            filter,
            no_color,
        } => {
            let spec_dir = spec.unwrap_or_else(|| config.defaults.spec_dir.clone());
            let suite = load_checked(&spec_dir)?;

            let outputs = if outputs.is_empty() {
                config.defaults.outputs.clone()
            } else {
                outputs
            };
            let color = config.output.color && !no_color;

            let mut options = RunOptions::from_config(&config, new_run_id());
            options.filter = filter;
            options.base_env = process_env();
            if let Some(dir) = paths::exe_dir() {
                options.tool_dirs.push(dir);
            }

            let mut sinks = Sinks::new();
            for spec in &outputs {
                let target = SinkTarget::parse(spec)?;
                if let SinkTarget::Files(Some(dir)) = &target {
                    options.artifacts_dir = dir.clone();
                }
                sinks.push(target.build(&config, global.verbose, color)?);
            }
            // Commands run in their context directories
            options.artifacts_dir = absolute(&options.artifacts_dir)?;

            let summary = Engine::new(&suite.tree, options, sinks).run().await;
            Ok(summary.success())
        }

        Commands::Validate { spec } => {
            let spec_dir = spec.unwrap_or_else(|| config.defaults.spec_dir.clone());
            let suite = load_suite(&spec_dir)?;
            if report_errors(&suite) {
                println!("{}: suite is valid", spec_dir.display());
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }
}

/// Load a suite, refusing to run it when validation found problems
fn load_checked(spec_dir: &Path) -> Result<LoadedSuite> {
    let suite = load_suite(spec_dir)?;
    if !report_errors(&suite) {
        return Err(Error::InvalidSuite(suite.errors.len()));
    }
    Ok(suite)
}

/// Print validation errors to stderr; true when there were none
fn report_errors(suite: &LoadedSuite) -> bool {
    for error in &suite.errors {
        eprintln!("{}", error);
    }
    suite.is_valid()
}

/// The invoking environment, minus entries that are not valid UTF-8
fn process_env() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// A parsed `--output` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Console,
    Json,
    Files(Option<PathBuf>),
    Junit(Option<PathBuf>),
}

impl SinkTarget {
    pub fn parse(spec: &str) -> Result<Self> {
        let (kind, arg) = match spec.split_once(':') {
            Some((kind, arg)) if !arg.is_empty() => (kind, Some(PathBuf::from(arg))),
            Some((kind, _)) => (kind, None),
            None => (spec, None),
        };
        match (kind, arg) {
            ("console", None) => Ok(Self::Console),
            ("json", None) => Ok(Self::Json),
            ("files", dir) => Ok(Self::Files(dir)),
            ("junit", file) => Ok(Self::Junit(file)),
            _ => Err(Error::Config(format!(
                "Unknown output '{}'. Supported: console, json, files[:DIR], junit[:FILE]",
                spec
            ))),
        }
    }

    fn build(&self, config: &Config, verbose: bool, color: bool) -> Result<Box<dyn Sink>> {
        Ok(match self {
            Self::Console => {
                let verbosity = if verbose {
                    Verbosity::Tree
                } else {
                    Verbosity::Dots
                };
                Box::new(ConsoleSink::stdout(verbosity, color))
            }
            Self::Json => Box::new(JsonSink::stdout()),
            Self::Files(dir) => {
                let root = dir.clone().unwrap_or_else(|| config.output.artifacts_dir.clone());
                Box::new(FileSink::new(absolute(&root)?))
            }
            Self::Junit(Some(file)) => Box::new(JunitSink::to_file(file)?),
            Self::Junit(None) => Box::new(JunitSink::stdout()),
        })
    }
}
