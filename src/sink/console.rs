//! Human-readable console reporter

use std::collections::HashMap;
use std::io::Write;

use colored::{Color, Colorize};

use super::Sink;
use crate::common::Result;
use crate::event::{Event, Status, Stream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// One character per scenario
    Dots,
    /// Indented tree of contexts, groups and scenarios
    Tree,
}

#[derive(Debug, Default)]
struct Captured {
    stdout: String,
    stderr: String,
}

struct Failure {
    path: String,
    output: Captured,
}

pub struct ConsoleSink {
    writer: Box<dyn Write + Send>,
    verbosity: Verbosity,
    color: bool,
    depth: usize,
    /// Scenario entered but not yet known to be a leaf
    pending: Option<String>,
    outputs: HashMap<String, Captured>,
    failures: Vec<Failure>,
}

impl ConsoleSink {
    pub fn new(writer: Box<dyn Write + Send>, verbosity: Verbosity, color: bool) -> Self {
        Self {
            writer,
            verbosity,
            color,
            depth: 0,
            pending: None,
            outputs: HashMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn stdout(verbosity: Verbosity, color: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), verbosity, color)
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }

    /// Print a pending scenario as a group heading once a child shows up
    fn open_pending_group(&mut self) -> Result<()> {
        if let Some(name) = self.pending.take() {
            if self.verbosity == Verbosity::Tree {
                let indent = self.indent();
                writeln!(self.writer, "{}{}", indent, name)?;
            }
            self.depth += 1;
        }
        Ok(())
    }

    fn scenario_exit(&mut self, path: &str, status: Status) -> Result<()> {
        let Some(name) = self.pending.take() else {
            // group closing
            self.depth = self.depth.saturating_sub(1);
            self.outputs.remove(path);
            return Ok(());
        };

        let (mark, color) = match status {
            Status::Pass => (".", Color::Green),
            Status::Fail => ("F", Color::Red),
            Status::Skip => ("S", Color::Yellow),
        };
        let line = match self.verbosity {
            Verbosity::Dots => self.paint(mark, color),
            Verbosity::Tree if self.color => {
                format!("{}{}\n", self.indent(), self.paint(&name, color))
            }
            Verbosity::Tree => format!("{}{} {}\n", self.indent(), name, mark),
        };
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;

        let output = self.outputs.remove(path).unwrap_or_default();
        if status == Status::Fail {
            self.failures.push(Failure {
                path: path.to_string(),
                output,
            });
        }
        Ok(())
    }

    fn print_failures(&mut self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "Failures:\n")?;
        let failures = std::mem::take(&mut self.failures);
        for (index, failure) in failures.iter().enumerate() {
            let path = self.paint(&failure.path, Color::Red);
            writeln!(self.writer, "  {}) {}", index + 1, path)?;
            self.print_indented("stdout", &failure.output.stdout)?;
            self.print_indented("stderr", &failure.output.stderr)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_indented(&mut self, label: &str, content: &str) -> Result<()> {
        if content.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "     {}:", label)?;
        for line in content.strip_suffix('\n').unwrap_or(content).split('\n') {
            writeln!(self.writer, "       {}", line)?;
        }
        Ok(())
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn emit(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::ContextEnter { name, .. } => {
                if self.verbosity == Verbosity::Tree {
                    let indent = self.indent();
                    writeln!(self.writer, "{}{}", indent, name)?;
                }
                self.depth += 1;
            }
            Event::ContextExit { .. } => {
                self.depth = self.depth.saturating_sub(1);
            }
            Event::ScenarioEnter { name, .. } => {
                self.open_pending_group()?;
                self.pending = Some(name.clone());
            }
            Event::ScenarioExit { path, status, .. } => {
                self.scenario_exit(path, *status)?;
            }
            Event::Output {
                path, stream, data, ..
            } => {
                let captured = self.outputs.entry(path.clone()).or_default();
                match stream {
                    Stream::Stdout => captured.stdout.push_str(data),
                    Stream::Stderr => captured.stderr.push_str(data),
                }
            }
            Event::RunEnd {
                passed,
                failed,
                skipped,
                ..
            } => {
                if self.verbosity == Verbosity::Dots {
                    writeln!(self.writer)?;
                }
                writeln!(self.writer)?;
                self.print_failures()?;
                let mut summary = format!("{} passed, {} failed", passed, failed);
                if *skipped > 0 {
                    summary.push_str(&format!(", {} skipped", skipped));
                }
                let color = if *failed > 0 { Color::Red } else { Color::Green };
                let summary = self.paint(&summary, color);
                writeln!(self.writer, "{}", summary)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
