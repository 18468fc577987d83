//! Error types for basanos
//!
//! Failures that belong to a single phase (a command exiting non-zero, a
//! deadline elapsing) are not errors here: they are reported through the
//! event stream. These variants cover what stops a file, an invocation or
//! the whole run from starting.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for basanos
#[derive(Error, Debug)]
pub enum Error {
    // === Spec Errors ===
    #[error("Failed to read context file '{path}': {error}")]
    SpecRead { path: String, error: String },

    #[error("Failed to parse context file '{path}': {message}")]
    SpecParse { path: String, message: String },

    #[error("Suite is invalid: {0} validation error(s)")]
    InvalidSuite(usize),

    // === Assertion Errors ===
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Cannot resolve operand '{operand}': {error}")]
    Resolution { operand: String, error: String },

    // === Execution Errors ===
    #[error("Failed to start '{program}': {error}")]
    Spawn { program: String, error: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a spec read error for a context file
    pub fn spec_read(path: &Path, error: &io::Error) -> Self {
        Self::SpecRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a spec parse error for a context file
    pub fn spec_parse(path: &Path, message: impl ToString) -> Self {
        Self::SpecParse {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create an operand resolution error
    pub fn resolution(operand: &str, error: impl ToString) -> Self {
        Self::Resolution {
            operand: operand.to_string(),
            error: error.to_string(),
        }
    }

    /// Create a spawn error
    pub fn spawn(program: &str, error: impl ToString) -> Self {
        Self::Spawn {
            program: program.to_string(),
            error: error.to_string(),
        }
    }
}
