//! Execution engine
//!
//! Turns a loaded suite into an ordered event stream: hooks cascade across
//! nesting levels, every phase runs as a subprocess under an optional
//! deadline, and failure policies decide what still runs.

pub mod process;
mod runner;
pub mod shell;
mod tree;

pub use process::{CapturedOutput, PhaseCommand, PhaseOutcome, EXIT_SPAWN_FAILED, EXIT_TIMEOUT};
pub use runner::{new_run_id, Engine, RunOptions, RunSummary};
pub use tree::{join_path, Node, NodeId, NodeKind, SuiteTree};
