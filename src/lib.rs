//! basanos - hierarchical acceptance-test runner
//!
//! Suites are directory trees of `context.yaml` files declaring nested
//! scenarios with setup/teardown hooks, a command to run and assertions on
//! its captured output. The engine turns a suite into an ordered event
//! stream consumed by any number of sinks.

pub mod assertion;
pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod event;
pub mod sink;
pub mod spec;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use engine::{Engine, RunOptions, RunSummary};
pub use event::{Event, Status};
