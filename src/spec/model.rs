//! Context file data model
//!
//! Defines the data structures for deserializing `context.yaml` files.
//! Every field is optional at parse time. Structural rules are checked
//! afterwards by the validator so that one pass can report every problem
//! in a file.

use serde::Deserialize;
use std::collections::BTreeMap;

/// A setup/teardown command
///
/// Whether it runs before/after or before_each/after_each is decided by the
/// field it occupies on its owner.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Hook {
    /// Shell command to execute
    pub run: String,
    /// Optional deadline, e.g. "10s" (empty means none)
    pub timeout: String,
}

/// The command under test of a leaf scenario
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RunBlock {
    /// Shell command to execute
    pub command: String,
    /// Optional deadline (empty means none)
    pub timeout: String,
}

/// A comparison evaluated against the run block's captured output
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Assertion {
    /// Assertion command, e.g. `assert_equals 0 ${RUN_OUTPUT}/exit_code`
    pub command: String,
    /// Optional deadline (empty means none)
    pub timeout: String,
}

/// A group of scenarios or a single leaf scenario
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Scenario {
    /// Identifier, unique among siblings
    pub id: String,
    /// Display name
    pub name: String,
    /// Environment overrides for this scenario and its descendants
    pub env: BTreeMap<String, String>,
    /// Failure policy override (empty inherits)
    pub on_failure: String,
    pub before: Option<Hook>,
    pub after: Option<Hook>,
    /// Only valid on groups
    pub before_each: Option<Hook>,
    /// Only valid on groups
    pub after_each: Option<Hook>,
    /// Only valid on leaves
    pub run: Option<RunBlock>,
    pub assertions: Vec<Assertion>,
    /// Nested scenarios (makes this scenario a group)
    pub scenarios: Vec<Scenario>,
}

impl Scenario {
    /// A group has nested scenarios
    pub fn is_group(&self) -> bool {
        !self.scenarios.is_empty()
    }

    /// A leaf has a run block and no nested scenarios
    pub fn is_leaf(&self) -> bool {
        self.run.is_some() && self.scenarios.is_empty()
    }

    /// Name to show in reports, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// A directory-level test declaration
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Context {
    pub name: String,
    pub description: String,
    pub env: BTreeMap<String, String>,
    pub on_failure: String,
    pub before: Option<Hook>,
    pub after: Option<Hook>,
    pub before_each: Option<Hook>,
    pub after_each: Option<Hook>,
    pub scenarios: Vec<Scenario>,
}

/// How a failure propagates through the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Proceed with the next sibling
    Continue,
    /// Skip the remaining children of the enclosing group
    SkipChildren,
    /// Skip everything not yet started and end the run
    AbortRun,
}

impl OnFailure {
    /// Parse a non-empty policy name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "continue" => Some(Self::Continue),
            "skip_children" => Some(Self::SkipChildren),
            "abort_run" => Some(Self::AbortRun),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::SkipChildren => "skip_children",
            Self::AbortRun => "abort_run",
        }
    }
}

/// Parse a context file
pub fn parse_context(data: &[u8]) -> std::result::Result<Context, serde_yaml::Error> {
    // An empty document is a context with every field defaulted
    let context: Option<Context> = serde_yaml::from_slice(data)?;
    Ok(context.unwrap_or_default())
}
