//! Spec model
//!
//! Typed context/scenario records parsed from YAML, the structural
//! validator and the directory-tree loader.

mod duration;
mod loader;
mod model;
mod validate;

pub use duration::{parse_duration, InvalidDuration};
pub use loader::{load_context, load_spec_tree, load_suite, LoadedSuite, SpecTree};
pub use model::*;
pub use validate::{validate, ValidationError};
