//! Run events
//!
//! The engine is the only producer. Every sink receives the same events in
//! the same order; an event is never changed once emitted.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Outcome attached to exit events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
    Skip,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Trigger point of a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    Before,
    After,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::BeforeEach => "before_each",
            Self::AfterEach => "after_each",
        }
    }
}

/// One state transition of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RunStart {
        run_id: String,
        timestamp: String,
    },
    ContextEnter {
        run_id: String,
        path: String,
        name: String,
        timestamp: String,
    },
    ContextExit {
        run_id: String,
        path: String,
        status: Status,
        timestamp: String,
    },
    ScenarioEnter {
        run_id: String,
        path: String,
        name: String,
        timestamp: String,
    },
    ScenarioExit {
        run_id: String,
        path: String,
        status: Status,
        timestamp: String,
    },
    HookStart {
        run_id: String,
        path: String,
        hook: HookKind,
        /// Declaring ancestor for before_each/after_each hooks
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        timestamp: String,
    },
    HookEnd {
        run_id: String,
        path: String,
        hook: HookKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        exit_code: i32,
        timestamp: String,
    },
    ScenarioRunStart {
        run_id: String,
        path: String,
        timestamp: String,
    },
    ScenarioRunEnd {
        run_id: String,
        path: String,
        exit_code: i32,
        timestamp: String,
    },
    AssertionStart {
        run_id: String,
        path: String,
        index: usize,
        command: String,
        timestamp: String,
    },
    AssertionEnd {
        run_id: String,
        path: String,
        index: usize,
        command: String,
        exit_code: i32,
        timestamp: String,
    },
    Output {
        run_id: String,
        path: String,
        stream: Stream,
        data: String,
        timestamp: String,
    },
    Timeout {
        run_id: String,
        path: String,
        phase: String,
        limit: String,
        timestamp: String,
    },
    RunEnd {
        run_id: String,
        status: Status,
        passed: usize,
        failed: usize,
        skipped: usize,
        timestamp: String,
    },
}

impl Event {
    /// The `event` tag this variant serializes with
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run_start",
            Self::ContextEnter { .. } => "context_enter",
            Self::ContextExit { .. } => "context_exit",
            Self::ScenarioEnter { .. } => "scenario_enter",
            Self::ScenarioExit { .. } => "scenario_exit",
            Self::HookStart { .. } => "hook_start",
            Self::HookEnd { .. } => "hook_end",
            Self::ScenarioRunStart { .. } => "scenario_run_start",
            Self::ScenarioRunEnd { .. } => "scenario_run_end",
            Self::AssertionStart { .. } => "assertion_start",
            Self::AssertionEnd { .. } => "assertion_end",
            Self::Output { .. } => "output",
            Self::Timeout { .. } => "timeout",
            Self::RunEnd { .. } => "run_end",
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run_id, .. }
            | Self::ContextEnter { run_id, .. }
            | Self::ContextExit { run_id, .. }
            | Self::ScenarioEnter { run_id, .. }
            | Self::ScenarioExit { run_id, .. }
            | Self::HookStart { run_id, .. }
            | Self::HookEnd { run_id, .. }
            | Self::ScenarioRunStart { run_id, .. }
            | Self::ScenarioRunEnd { run_id, .. }
            | Self::AssertionStart { run_id, .. }
            | Self::AssertionEnd { run_id, .. }
            | Self::Output { run_id, .. }
            | Self::Timeout { run_id, .. }
            | Self::RunEnd { run_id, .. } => run_id,
        }
    }

    /// Node address, absent for run-level events
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::RunStart { .. } | Self::RunEnd { .. } => None,
            Self::ContextEnter { path, .. }
            | Self::ContextExit { path, .. }
            | Self::ScenarioEnter { path, .. }
            | Self::ScenarioExit { path, .. }
            | Self::HookStart { path, .. }
            | Self::HookEnd { path, .. }
            | Self::ScenarioRunStart { path, .. }
            | Self::ScenarioRunEnd { path, .. }
            | Self::AssertionStart { path, .. }
            | Self::AssertionEnd { path, .. }
            | Self::Output { path, .. }
            | Self::Timeout { path, .. } => Some(path),
        }
    }
}

/// Current time as RFC 3339 UTC with second precision
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
