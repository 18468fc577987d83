//! On-disk artifact tree
//!
//! Layout: `<root>/<run_id>/<path>/<phase>/{stdout,stderr,exit_code}` where
//! phase is `_run`, `_assertions/<index>` or a hook name.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::Sink;
use crate::common::Result;
use crate::event::Event;

pub struct FileSink {
    root: PathBuf,
    /// Phase directory receiving output events
    current: Option<PathBuf>,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            current: None,
        }
    }

    fn phase_dir(&self, run_id: &str, path: &str, phase: &str) -> PathBuf {
        let mut dir = self.root.join(run_id);
        for segment in path.split('/').chain(phase.split('/')) {
            if !segment.is_empty() {
                dir.push(segment);
            }
        }
        dir
    }

    fn begin(&mut self, run_id: &str, path: &str, phase: &str) -> Result<()> {
        let dir = self.phase_dir(run_id, path, phase);
        fs::create_dir_all(&dir)?;
        self.current = Some(dir);
        Ok(())
    }

    fn write_exit_code(&self, run_id: &str, path: &str, phase: &str, code: i32) -> Result<()> {
        let dir = self.phase_dir(run_id, path, phase);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("exit_code"), code.to_string())?;
        Ok(())
    }

    fn append(&self, stream: &str, data: &str) -> Result<()> {
        let Some(dir) = &self.current else {
            return Ok(());
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(stream))?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }
}

fn ensure_file(path: &Path) -> Result<()> {
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        "files"
    }

    fn emit(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::HookStart {
                run_id, path, hook, ..
            } => self.begin(run_id, path, hook.as_str())?,
            Event::HookEnd {
                run_id,
                path,
                hook,
                exit_code,
                ..
            } => self.write_exit_code(run_id, path, hook.as_str(), *exit_code)?,
            Event::ScenarioRunStart { run_id, path, .. } => self.begin(run_id, path, "_run")?,
            Event::ScenarioRunEnd {
                run_id,
                path,
                exit_code,
                ..
            } => {
                let dir = self.phase_dir(run_id, path, "_run");
                fs::create_dir_all(&dir)?;
                ensure_file(&dir.join("stdout"))?;
                ensure_file(&dir.join("stderr"))?;
                self.write_exit_code(run_id, path, "_run", *exit_code)?;
            }
            Event::AssertionStart {
                run_id,
                path,
                index,
                ..
            } => self.begin(run_id, path, &format!("_assertions/{index}"))?,
            Event::AssertionEnd {
                run_id,
                path,
                index,
                exit_code,
                ..
            } => self.write_exit_code(run_id, path, &format!("_assertions/{index}"), *exit_code)?,
            Event::Output { stream, data, .. } => self.append(stream.as_str(), data)?,
            _ => {}
        }
        Ok(())
    }
}
