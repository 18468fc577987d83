//! Newline-delimited JSON event stream

use std::io::Write;

use super::Sink;
use crate::common::Result;
use crate::event::Event;

pub struct JsonSink {
    writer: Box<dyn Write + Send>,
}

impl JsonSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl Sink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn emit(&mut self, event: &Event) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        // consumers tail the stream live
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
