//! Common utilities shared by the runner and the assertion binaries

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
