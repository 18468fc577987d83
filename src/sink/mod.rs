//! Event consumers
//!
//! Sinks never influence the run: a sink that fails to write is logged and
//! the remaining sinks still see every event.

mod console;
mod files;
mod json;
mod junit;

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::common::Result;
use crate::event::Event;

pub use console::{ConsoleSink, Verbosity};
pub use files::FileSink;
pub use json::JsonSink;
pub use junit::JunitSink;

pub trait Sink: Send {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    fn emit(&mut self, event: &Event) -> Result<()>;

    /// Called once after the final event
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Ordered fan-out to every registered sink
#[derive(Default)]
pub struct Sinks {
    sinks: Vec<Box<dyn Sink>>,
}

impl Sinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn emit(&mut self, event: &Event) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.emit(event) {
                tracing::warn!(sink = sink.name(), event = event.kind(), "Sink write failed: {}", e);
            }
        }
    }

    pub fn finish(&mut self) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish() {
                tracing::warn!(sink = sink.name(), "Sink finish failed: {}", e);
            }
        }
    }
}

/// Keeps every event in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Sink for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn emit(&mut self, event: &Event) -> Result<()> {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
        Ok(())
    }
}

/// In-memory writer whose clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = match self.bytes.lock() {
            Ok(bytes) => bytes,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut bytes = match self.bytes.lock() {
            Ok(bytes) => bytes,
            Err(poisoned) => poisoned.into_inner(),
        };
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
