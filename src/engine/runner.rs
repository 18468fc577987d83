//! Suite traversal
//!
//! Walks the arena depth-first in document order, one phase at a time.
//! The stack of entered nodes doubles as the environment layering order and
//! the before_each/after_each chain of the current leaf.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assertion::protocol;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::event::{timestamp, Event, HookKind, Status, Stream};
use crate::sink::Sinks;
use crate::spec::{parse_duration, Hook, OnFailure, SpecTree};

use super::process::{self, CapturedOutput, PhaseCommand};
use super::shell;
use super::tree::{NodeId, NodeKind, SuiteTree};

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub run_id: String,
    /// Root of the artifact tree the output-reference variable points into
    pub artifacts_dir: PathBuf,
    pub output_ref_var: String,
    /// Searched for assertion executables before `PATH`
    pub tool_dirs: Vec<PathBuf>,
    /// Deadline for phases that declare none
    pub default_timeout: Option<Duration>,
    pub filter: Option<String>,
    /// Environment every phase starts from
    pub base_env: BTreeMap<String, String>,
}

impl RunOptions {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self::from_config(&Config::default(), run_id)
    }

    pub fn from_config(config: &Config, run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            artifacts_dir: config.output.artifacts_dir.clone(),
            output_ref_var: config.runner.output_ref_var.clone(),
            tool_dirs: config.runner.tool_dirs.clone(),
            default_timeout: config.timeouts.default_phase(),
            filter: None,
            base_env: BTreeMap::new(),
        }
    }
}

/// Run identifier derived from the local start time
pub fn new_run_id() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H%M%S").to_string()
}

/// Leaf counts of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: String,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn status(&self) -> Status {
        if self.failed > 0 {
            Status::Fail
        } else {
            Status::Pass
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

struct Outcome {
    status: Status,
    /// Policy triggered by a direct failure of this node
    triggered: Option<OnFailure>,
}

pub struct Engine {
    tree: SuiteTree,
    options: RunOptions,
    sinks: Sinks,
    selected: Vec<bool>,
    /// Entered nodes, outermost first
    scope: Vec<NodeId>,
    aborted: bool,
    summary: RunSummary,
}

impl Engine {
    pub fn new(spec: &SpecTree, options: RunOptions, sinks: Sinks) -> Self {
        let tree = SuiteTree::build(spec);
        let selected = tree.select(options.filter.as_deref());
        let summary = RunSummary {
            run_id: options.run_id.clone(),
            ..RunSummary::default()
        };
        Self {
            tree,
            options,
            sinks,
            selected,
            scope: Vec::new(),
            aborted: false,
            summary,
        }
    }

    /// Execute the whole suite and flush every sink
    pub async fn run(mut self) -> RunSummary {
        tracing::info!(run_id = %self.options.run_id, nodes = self.tree.len(), "Run started");
        self.emit(Event::RunStart {
            run_id: self.options.run_id.clone(),
            timestamp: timestamp(),
        });

        if self.selected[SuiteTree::ROOT] {
            self.run_node(SuiteTree::ROOT).await;
        } else {
            self.skip_node(SuiteTree::ROOT);
        }

        let summary = self.summary.clone();
        self.emit(Event::RunEnd {
            run_id: summary.run_id.clone(),
            status: summary.status(),
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            timestamp: timestamp(),
        });
        self.sinks.finish();
        tracing::info!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Run finished"
        );
        summary
    }

    fn emit(&mut self, event: Event) {
        self.sinks.emit(&event);
    }

    async fn run_node(&mut self, id: NodeId) -> Outcome {
        match self.tree.node(id).kind {
            NodeKind::Context | NodeKind::Group => self.run_container(id).await,
            NodeKind::Leaf => self.run_leaf(id).await,
            NodeKind::Empty => {
                self.skip_node(id);
                Outcome {
                    status: Status::Skip,
                    triggered: None,
                }
            }
        }
    }

    async fn run_container(&mut self, id: NodeId) -> Outcome {
        let node = self.tree.node(id).clone();
        self.emit_enter(id);
        self.scope.push(id);

        let mut failed = false;
        let mut triggered = None;
        let mut block_children = false;

        if let Some(hook) = &node.before {
            if !self.run_hook(id, id, hook, HookKind::Before, None).await {
                failed = true;
                // a failed setup applies the policy to this node's own children
                block_children = self.trigger(id) == OnFailure::SkipChildren;
            }
        }

        let mut statuses = Vec::with_capacity(node.children.len());
        let mut skip_rest = block_children;
        for &child in &node.children {
            if self.aborted || skip_rest || !self.selected[child] {
                self.skip_node(child);
                statuses.push(Status::Skip);
                continue;
            }
            let outcome = Box::pin(self.run_node(child)).await;
            if outcome.triggered == Some(OnFailure::SkipChildren) {
                skip_rest = true;
            }
            statuses.push(outcome.status);
        }
        if statuses.contains(&Status::Fail) {
            failed = true;
        }

        if let Some(hook) = &node.after {
            if !self.run_hook(id, id, hook, HookKind::After, None).await {
                failed = true;
                triggered = Some(self.trigger(id));
            }
        }

        self.scope.pop();
        let status = if failed {
            Status::Fail
        } else if !statuses.is_empty() && statuses.iter().all(|s| *s == Status::Skip) {
            Status::Skip
        } else {
            Status::Pass
        };
        self.emit_exit(id, status);
        Outcome { status, triggered }
    }

    async fn run_leaf(&mut self, id: NodeId) -> Outcome {
        let node = self.tree.node(id).clone();
        self.emit_enter(id);
        self.scope.push(id);

        let mut failures: Vec<OnFailure> = Vec::new();
        let ancestors: Vec<NodeId> = self.scope[..self.scope.len() - 1].to_vec();

        let mut ready = true;
        for &ancestor in &ancestors {
            let Some(hook) = self.tree.node(ancestor).before_each.clone() else {
                continue;
            };
            if !self.run_hook(id, ancestor, &hook, HookKind::BeforeEach, Some(ancestor)).await {
                failures.push(self.trigger(ancestor));
                ready = false;
                break;
            }
        }
        if ready {
            if let Some(hook) = &node.before {
                if !self.run_hook(id, id, hook, HookKind::Before, None).await {
                    failures.push(self.trigger(id));
                    ready = false;
                }
            }
        }

        if ready {
            if let Some(run) = &node.run {
                let captured = self.run_block(id, &run.command, &run.timeout).await;
                if captured.exit_code != 0 {
                    failures.push(self.trigger(id));
                }
                for (index, assertion) in node.assertions.iter().enumerate() {
                    let exit_code = self
                        .run_assertion(id, index, &assertion.command, &assertion.timeout, &captured)
                        .await;
                    if exit_code != 0 {
                        failures.push(self.trigger(id));
                    }
                }
            }
        }

        if let Some(hook) = &node.after {
            if !self.run_hook(id, id, hook, HookKind::After, None).await {
                failures.push(self.trigger(id));
            }
        }
        for &ancestor in ancestors.iter().rev() {
            let Some(hook) = self.tree.node(ancestor).after_each.clone() else {
                continue;
            };
            if !self.run_hook(id, ancestor, &hook, HookKind::AfterEach, Some(ancestor)).await {
                failures.push(self.trigger(ancestor));
            }
        }

        self.scope.pop();
        let status = if failures.is_empty() {
            self.summary.passed += 1;
            Status::Pass
        } else {
            self.summary.failed += 1;
            Status::Fail
        };
        self.emit_exit(id, status);
        Outcome {
            status,
            triggered: failures.into_iter().max_by_key(|p| severity(*p)),
        }
    }

    /// Record a direct failure at `declared_by` and return its policy
    fn trigger(&mut self, declared_by: NodeId) -> OnFailure {
        let policy = self.tree.effective_policy(declared_by);
        tracing::debug!(path = %self.tree.node(declared_by).path, policy = policy.as_str(), "Failure policy applied");
        if policy == OnFailure::AbortRun {
            self.aborted = true;
        }
        policy
    }

    /// Emit enter/exit pairs with skip status for a whole subtree
    fn skip_node(&mut self, id: NodeId) {
        self.emit_enter(id);
        let children = self.tree.node(id).children.clone();
        for child in children {
            self.skip_node(child);
        }
        if self.tree.node(id).is_counted() {
            self.summary.skipped += 1;
        }
        self.emit_exit(id, Status::Skip);
    }

    fn emit_enter(&mut self, id: NodeId) {
        let node = self.tree.node(id);
        let run_id = self.options.run_id.clone();
        let (path, name) = (node.path.clone(), node.name.clone());
        let event = if node.kind == NodeKind::Context {
            Event::ContextEnter {
                run_id,
                path,
                name,
                timestamp: timestamp(),
            }
        } else {
            Event::ScenarioEnter {
                run_id,
                path,
                name,
                timestamp: timestamp(),
            }
        };
        self.emit(event);
    }

    fn emit_exit(&mut self, id: NodeId, status: Status) {
        let node = self.tree.node(id);
        let run_id = self.options.run_id.clone();
        let path = node.path.clone();
        let event = if node.kind == NodeKind::Context {
            Event::ContextExit {
                run_id,
                path,
                status,
                timestamp: timestamp(),
            }
        } else {
            Event::ScenarioExit {
                run_id,
                path,
                status,
                timestamp: timestamp(),
            }
        };
        self.emit(event);
    }

    /// Merged environment of the current scope
    fn scope_env(&self) -> BTreeMap<String, String> {
        let mut env = self.options.base_env.clone();
        for &id in &self.scope {
            for (key, value) in &self.tree.node(id).env {
                env.insert(key.clone(), value.clone());
            }
        }
        if let Some(&innermost) = self.scope.last() {
            let node = self.tree.node(innermost);
            if node.kind == NodeKind::Leaf {
                env.insert(
                    self.options.output_ref_var.clone(),
                    self.output_ref(&node.path).display().to_string(),
                );
            }
        }
        env
    }

    fn output_ref(&self, path: &str) -> PathBuf {
        let mut dir = self.options.artifacts_dir.join(&self.options.run_id);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir.join("_run")
    }

    fn phase_timeout(&self, declared: &str) -> (Option<Duration>, String) {
        if declared.is_empty() {
            return match self.options.default_timeout {
                Some(limit) => (Some(limit), format!("{}s", limit.as_secs_f64())),
                None => (None, String::new()),
            };
        }
        match parse_duration(declared) {
            Ok(limit) => (Some(limit), declared.to_string()),
            Err(e) => {
                tracing::warn!("Ignoring timeout: {}", e);
                (self.options.default_timeout, declared.to_string())
            }
        }
    }

    /// Run one hook at `path_of`, in the directory of `declared_by`
    async fn run_hook(
        &mut self,
        path_of: NodeId,
        declared_by: NodeId,
        hook: &Hook,
        kind: HookKind,
        from: Option<NodeId>,
    ) -> bool {
        let path = self.tree.node(path_of).path.clone();
        let from = from.map(|id| self.tree.node(id).path.clone());
        self.emit(Event::HookStart {
            run_id: self.options.run_id.clone(),
            path: path.clone(),
            hook: kind,
            from: from.clone(),
            timestamp: timestamp(),
        });

        let (timeout, limit) = self.phase_timeout(&hook.timeout);
        let cwd = self.tree.node(declared_by).dir.clone();
        let command = PhaseCommand::shell(&hook.run, cwd, self.scope_env()).with_timeout(timeout);
        let captured = self.run_phase(&path, &command, kind.as_str(), &limit).await;

        self.emit(Event::HookEnd {
            run_id: self.options.run_id.clone(),
            path,
            hook: kind,
            from,
            exit_code: captured.exit_code,
            timestamp: timestamp(),
        });
        captured.exit_code == 0
    }

    async fn run_block(&mut self, id: NodeId, script: &str, declared_timeout: &str) -> CapturedOutput {
        let node = self.tree.node(id);
        let (path, cwd) = (node.path.clone(), node.dir.clone());
        self.emit(Event::ScenarioRunStart {
            run_id: self.options.run_id.clone(),
            path: path.clone(),
            timestamp: timestamp(),
        });

        let (timeout, limit) = self.phase_timeout(declared_timeout);
        let command = PhaseCommand::shell(script, cwd, self.scope_env()).with_timeout(timeout);
        let captured = self.run_phase(&path, &command, "_run", &limit).await;

        self.emit(Event::ScenarioRunEnd {
            run_id: self.options.run_id.clone(),
            path,
            exit_code: captured.exit_code,
            timestamp: timestamp(),
        });
        captured
    }

    async fn run_assertion(
        &mut self,
        id: NodeId,
        index: usize,
        command_text: &str,
        declared_timeout: &str,
        captured: &CapturedOutput,
    ) -> i32 {
        let node = self.tree.node(id);
        let (path, cwd) = (node.path.clone(), node.dir.clone());
        self.emit(Event::AssertionStart {
            run_id: self.options.run_id.clone(),
            path: path.clone(),
            index,
            command: command_text.to_string(),
            timestamp: timestamp(),
        });

        let env = self.scope_env();
        let exit_code = match self.prepare_assertion(command_text, &cwd, env, captured) {
            Ok(command) => {
                let (timeout, limit) = self.phase_timeout(declared_timeout);
                let command = command.with_timeout(timeout);
                let phase = format!("_assertions/{index}");
                self.run_phase(&path, &command, &phase, &limit).await.exit_code
            }
            Err(e) => {
                self.emit(Event::Output {
                    run_id: self.options.run_id.clone(),
                    path: path.clone(),
                    stream: Stream::Stdout,
                    data: format!("ERROR: {}\n", e),
                    timestamp: timestamp(),
                });
                1
            }
        };

        self.emit(Event::AssertionEnd {
            run_id: self.options.run_id.clone(),
            path,
            index,
            command: command_text.to_string(),
            exit_code,
            timestamp: timestamp(),
        });
        exit_code
    }

    /// Expand, tokenize and resolve an assertion into a protocol invocation
    fn prepare_assertion(
        &self,
        command_text: &str,
        cwd: &Path,
        env: BTreeMap<String, String>,
        captured: &CapturedOutput,
    ) -> Result<PhaseCommand> {
        let expanded = shell::expand(command_text, &env);
        let (program, args) = shell::tokenize(&expanded)
            .ok_or_else(|| Error::resolution(command_text, "empty assertion command"))?;
        if args.len() < 2 {
            return Err(Error::resolution(
                &expanded,
                "assertion command must have an executable and 2 arguments",
            ));
        }

        let output_ref = env.get(&self.options.output_ref_var).cloned();
        let first = resolve_operand(&args[0], output_ref.as_deref(), captured, cwd)?;
        let second = resolve_operand(&args[1], output_ref.as_deref(), captured, cwd)?;

        let program = locate(&program, &self.options.tool_dirs, env.get("PATH"), cwd);
        Ok(PhaseCommand {
            program,
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env,
            stdin: Some(protocol::encode(&first, &second)),
            timeout: None,
        })
    }

    /// Execute a prepared phase, streaming its output as events
    async fn run_phase(&mut self, path: &str, command: &PhaseCommand, phase: &str, limit: &str) -> CapturedOutput {
        let sinks = &mut self.sinks;
        let run_id = &self.options.run_id;
        let outcome = process::execute(command, |stream, data| {
            sinks.emit(&Event::Output {
                run_id: run_id.clone(),
                path: path.to_string(),
                stream,
                data: data.to_string(),
                timestamp: timestamp(),
            });
        })
        .await;

        if outcome.timed_out {
            tracing::debug!(path, phase, limit, "Phase timed out");
            self.emit(Event::Timeout {
                run_id: self.options.run_id.clone(),
                path: path.to_string(),
                phase: phase.to_string(),
                limit: limit.to_string(),
                timestamp: timestamp(),
            });
        }
        outcome.output
    }
}

fn severity(policy: OnFailure) -> u8 {
    match policy {
        OnFailure::Continue => 0,
        OnFailure::SkipChildren => 1,
        OnFailure::AbortRun => 2,
    }
}

/// Substitute captured output for the synthetic references, else read the
/// operand as a file relative to `cwd`, else keep it literal
fn resolve_operand(
    arg: &str,
    output_ref: Option<&str>,
    captured: &CapturedOutput,
    cwd: &Path,
) -> Result<Vec<u8>> {
    if let Some(reference) = output_ref.filter(|r| !r.is_empty()) {
        if let Some(field) = arg.strip_prefix(reference).and_then(|rest| rest.strip_prefix('/')) {
            match field {
                "stdout" => return Ok(captured.stdout.clone()),
                "stderr" => return Ok(captured.stderr.clone()),
                "exit_code" => return Ok(captured.exit_code.to_string().into_bytes()),
                _ => {}
            }
        }
    }
    crate::assertion::resolve_value_in(arg, Some(cwd))
}

/// Find an assertion executable in the tool directories, then on `PATH`
fn locate(program: &str, tool_dirs: &[PathBuf], path_var: Option<&String>, cwd: &Path) -> PathBuf {
    if program.contains('/') {
        return cwd.join(program);
    }
    for dir in tool_dirs {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return candidate;
        }
    }
    which::which_in(program, path_var, cwd).unwrap_or_else(|_| PathBuf::from(program))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured() -> CapturedOutput {
        CapturedOutput {
            stdout: b"line one\nline two\n\xff".to_vec(),
            stderr: b"warn\n".to_vec(),
            exit_code: 3,
        }
    }

    #[test]
    fn test_synthetic_references_use_captured_output() {
        let cwd = std::env::temp_dir();
        let reference = Some("/runs/r1/a/_run");
        assert_eq!(
            resolve_operand("/runs/r1/a/_run/stdout", reference, &captured(), &cwd).unwrap(),
            b"line one\nline two\n\xff"
        );
        assert_eq!(
            resolve_operand("/runs/r1/a/_run/stderr", reference, &captured(), &cwd).unwrap(),
            b"warn\n"
        );
        assert_eq!(
            resolve_operand("/runs/r1/a/_run/exit_code", reference, &captured(), &cwd).unwrap(),
            b"3"
        );
    }

    #[test]
    fn test_other_operands_are_file_or_literal() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("expected.txt"), "fixture").unwrap();
        let reference = Some("/runs/r1/a/_run");

        assert_eq!(
            resolve_operand("expected.txt", reference, &captured(), temp.path()).unwrap(),
            b"fixture"
        );
        assert_eq!(
            resolve_operand("/runs/r1/a/_run/other", reference, &captured(), temp.path()).unwrap(),
            b"/runs/r1/a/_run/other"
        );
        assert_eq!(resolve_operand("0", None, &captured(), temp.path()).unwrap(), b"0");
    }

    #[test]
    fn test_locate_prefers_tool_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let tool = temp.path().join("assert_custom");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();

        let found = locate("assert_custom", &[temp.path().to_path_buf()], None, temp.path());
        assert_eq!(found, tool);

        let missing = locate("basanos-no-such-tool", &[], None, temp.path());
        assert_eq!(missing, PathBuf::from("basanos-no-such-tool"));
    }

    #[test]
    fn test_summary_status() {
        let mut summary = RunSummary::default();
        assert_eq!(summary.status(), Status::Pass);
        summary.failed = 1;
        assert_eq!(summary.status(), Status::Fail);
        assert!(!summary.success());
    }

    #[test]
    fn test_run_id_format() {
        let id = new_run_id();
        assert_eq!(id.len(), "2026-01-01_120000".len());
        assert_eq!(&id[10..11], "_");
    }
}
