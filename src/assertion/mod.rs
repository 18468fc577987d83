//! Assertion primitives
//!
//! Each primitive compares two operands and renders a fixed report. They
//! are shipped as standalone executables (`assert_*`) that take operands
//! either as arguments or through the length-prefixed protocol on stdin.

use std::borrow::Cow;

pub mod cli;
mod contains;
mod equals;
mod matches;
mod numeric;
pub mod protocol;
mod resolve;

pub use contains::{contains, ContainsResult};
pub use equals::{equals, EqualsResult};
pub use matches::{matches, MatchesResult};
pub use numeric::{
    compare, greater_or_equal, greater_than, less_or_equal, less_than, Comparison, NumericResult,
};
pub use resolve::{resolve_value, resolve_value_in, Resolution};

/// Outcome of one comparison
pub trait AssertionResult {
    fn passed(&self) -> bool;
    fn report(&self) -> String;
}

/// A named comparison plus how its literal operands are resolved
pub struct Primitive {
    pub name: &'static str,
    pub usage: &'static str,
    pub resolution: Resolution,
    pub evaluate: fn(&[u8], &[u8]) -> Box<dyn AssertionResult>,
}

pub const EQUALS: Primitive = Primitive {
    name: "assert_equals",
    usage: "<expected> <actual>",
    resolution: Resolution::BothValues,
    evaluate: eval_equals,
};

pub const CONTAINS: Primitive = Primitive {
    name: "assert_contains",
    usage: "<needle> <haystack>",
    resolution: Resolution::BothValues,
    evaluate: eval_contains,
};

pub const MATCHES: Primitive = Primitive {
    name: "assert_matches",
    usage: "<pattern> <target>",
    resolution: Resolution::LiteralAndValue,
    evaluate: eval_matches,
};

pub const GREATER_THAN: Primitive = Primitive {
    name: "assert_gt",
    usage: "<left> <right>",
    resolution: Resolution::Literals,
    evaluate: eval_gt,
};

pub const GREATER_OR_EQUAL: Primitive = Primitive {
    name: "assert_gte",
    usage: "<left> <right>",
    resolution: Resolution::Literals,
    evaluate: eval_gte,
};

pub const LESS_THAN: Primitive = Primitive {
    name: "assert_lt",
    usage: "<left> <right>",
    resolution: Resolution::Literals,
    evaluate: eval_lt,
};

pub const LESS_OR_EQUAL: Primitive = Primitive {
    name: "assert_lte",
    usage: "<left> <right>",
    resolution: Resolution::Literals,
    evaluate: eval_lte,
};

pub const ALL: [&Primitive; 7] = [
    &EQUALS,
    &CONTAINS,
    &MATCHES,
    &GREATER_THAN,
    &GREATER_OR_EQUAL,
    &LESS_THAN,
    &LESS_OR_EQUAL,
];

fn eval_equals(a: &[u8], b: &[u8]) -> Box<dyn AssertionResult> {
    Box::new(equals(a, b))
}

fn eval_contains(a: &[u8], b: &[u8]) -> Box<dyn AssertionResult> {
    Box::new(contains(a, b))
}

fn eval_matches(a: &[u8], b: &[u8]) -> Box<dyn AssertionResult> {
    Box::new(matches(a, b))
}

fn eval_gt(a: &[u8], b: &[u8]) -> Box<dyn AssertionResult> {
    Box::new(greater_than(&lossy(a), &lossy(b)))
}

fn eval_gte(a: &[u8], b: &[u8]) -> Box<dyn AssertionResult> {
    Box::new(greater_or_equal(&lossy(a), &lossy(b)))
}

fn eval_lt(a: &[u8], b: &[u8]) -> Box<dyn AssertionResult> {
    Box::new(less_than(&lossy(a), &lossy(b)))
}

fn eval_lte(a: &[u8], b: &[u8]) -> Box<dyn AssertionResult> {
    Box::new(less_or_equal(&lossy(a), &lossy(b)))
}

/// Render operand bytes for a report
fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

const RULE: &str = "────────────────────────────────────────\n";

/// Indent every line by two spaces, terminating the block with a newline
fn indent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for line in text.split('\n') {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}
