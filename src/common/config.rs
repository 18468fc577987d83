//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Execution engine settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Output sink settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Default settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Root directory of the suite
    #[serde(default = "default_spec_dir")]
    pub spec_dir: PathBuf,

    /// Sinks used when no `--output` flag is given
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            spec_dir: default_spec_dir(),
            outputs: default_outputs(),
        }
    }
}

fn default_spec_dir() -> PathBuf {
    PathBuf::from("spec")
}

fn default_outputs() -> Vec<String> {
    vec!["console".to_string(), "files".to_string()]
}

/// Execution engine settings
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// Variable through which commands address the last captured output
    #[serde(default = "default_output_ref_var")]
    pub output_ref_var: String,

    /// Directories searched for executables before `PATH`
    #[serde(default)]
    pub tool_dirs: Vec<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_ref_var: default_output_ref_var(),
            tool_dirs: Vec::new(),
        }
    }
}

fn default_output_ref_var() -> String {
    "RUN_OUTPUT".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Default)]
pub struct Timeouts {
    /// Deadline for phases that declare no timeout of their own
    #[serde(default)]
    pub default_phase_secs: Option<u64>,
}

impl Timeouts {
    /// Fallback phase deadline, if configured
    pub fn default_phase(&self) -> Option<Duration> {
        self.default_phase_secs.map(Duration::from_secs)
    }
}

/// Output sink configuration
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Root of the on-disk artifact tree
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Whether the console reporter uses ANSI colors
    #[serde(default = "default_color")]
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            color: default_color(),
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn default_color() -> bool {
    true
}

impl Config {
    /// Load configuration from an explicit file or the default config file
    ///
    /// Returns default configuration if no file exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::Error::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
