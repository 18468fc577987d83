//! JUnit XML report
//!
//! One `<testsuite>` per context holding leaf scenarios, one `<testcase>`
//! per leaf. The document is written when the run ends.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::Sink;
use crate::common::Result;
use crate::event::{Event, Status, Stream};

#[derive(Debug)]
struct Case {
    name: String,
    path: String,
    status: Status,
    stdout: String,
    stderr: String,
}

#[derive(Debug)]
struct Suite {
    name: String,
    path: String,
    cases: Vec<Case>,
}

pub struct JunitSink {
    writer: Box<dyn Write + Send>,
    /// Finished suites in document order
    suites: Vec<Suite>,
    /// Indices into `suites` of the open contexts
    open: Vec<usize>,
    /// Scenario entered but not yet known to be a leaf
    pending: Option<(String, String)>,
    outputs: HashMap<String, (String, String)>,
    written: bool,
}

impl JunitSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            suites: Vec::new(),
            open: Vec::new(),
            pending: None,
            outputs: HashMap::new(),
            written: false,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Write the report to `path`, creating parent directories
    pub fn to_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(Box::new(File::create(path)?)))
    }

    fn leaf_exit(&mut self, path: &str, status: Status) {
        let Some((name, leaf_path)) = self.pending.take() else {
            self.outputs.remove(path);
            return;
        };
        let (stdout, stderr) = self.outputs.remove(path).unwrap_or_default();
        let case = Case {
            name,
            path: leaf_path,
            status,
            stdout,
            stderr,
        };
        if let Some(&suite) = self.open.last() {
            self.suites[suite].cases.push(case);
        }
    }

    fn render(&self) -> String {
        let suites: Vec<&Suite> = self.suites.iter().filter(|s| !s.cases.is_empty()).collect();
        let total: usize = suites.iter().map(|s| s.cases.len()).sum();
        let failures = count(&suites, Status::Fail);
        let skipped = count(&suites, Status::Skip);

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<testsuites tests=\"{}\" failures=\"{}\" skipped=\"{}\">\n",
            total, failures, skipped
        ));
        for suite in suites {
            let suite_failures = suite.cases.iter().filter(|c| c.status == Status::Fail).count();
            let suite_skipped = suite.cases.iter().filter(|c| c.status == Status::Skip).count();
            xml.push_str(&format!(
                "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" skipped=\"{}\">\n",
                escape(&suite.name),
                suite.cases.len(),
                suite_failures,
                suite_skipped
            ));
            for case in &suite.cases {
                let open = format!(
                    "    <testcase name=\"{}\" classname=\"{}\"",
                    escape(&case.name),
                    escape(&classname(&suite.path, &case.path))
                );
                match case.status {
                    Status::Pass => xml.push_str(&format!("{}/>\n", open)),
                    Status::Skip => {
                        xml.push_str(&format!("{}>\n      <skipped/>\n    </testcase>\n", open))
                    }
                    Status::Fail => {
                        xml.push_str(&format!("{}>\n", open));
                        xml.push_str(&format!(
                            "      <failure message=\"scenario failed\">{}</failure>\n",
                            escape(&case.stdout)
                        ));
                        if !case.stderr.is_empty() {
                            xml.push_str(&format!(
                                "      <system-err>{}</system-err>\n",
                                escape(&case.stderr)
                            ));
                        }
                        xml.push_str("    </testcase>\n");
                    }
                }
            }
            xml.push_str("  </testsuite>\n");
        }
        xml.push_str("</testsuites>\n");
        xml
    }

    fn write_report(&mut self) -> Result<()> {
        if self.written {
            return Ok(());
        }
        let xml = self.render();
        self.writer.write_all(xml.as_bytes())?;
        self.writer.flush()?;
        self.written = true;
        Ok(())
    }
}

fn count(suites: &[&Suite], status: Status) -> usize {
    suites
        .iter()
        .flat_map(|s| s.cases.iter())
        .filter(|c| c.status == status)
        .count()
}

/// Dotted address of the case's parent within its context
fn classname(suite_path: &str, case_path: &str) -> String {
    let parent = case_path.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
    let dotted = parent.replace('/', ".");
    if dotted.is_empty() {
        if suite_path.is_empty() {
            "root".to_string()
        } else {
            suite_path.replace('/', ".")
        }
    } else {
        dotted
    }
}

/// Escape XML markup and drop characters XML 1.0 cannot carry
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

impl Sink for JunitSink {
    fn name(&self) -> &str {
        "junit"
    }

    fn emit(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::ContextEnter { path, name, .. } => {
                self.suites.push(Suite {
                    name: name.clone(),
                    path: path.clone(),
                    cases: Vec::new(),
                });
                self.open.push(self.suites.len() - 1);
            }
            Event::ContextExit { .. } => {
                self.open.pop();
            }
            Event::ScenarioEnter { path, name, .. } => {
                // a nested enter means the pending scenario is a group
                self.pending = Some((name.clone(), path.clone()));
            }
            Event::ScenarioExit { path, status, .. } => self.leaf_exit(path, *status),
            Event::Output {
                path, stream, data, ..
            } => {
                let entry = self.outputs.entry(path.clone()).or_default();
                match stream {
                    Stream::Stdout => entry.0.push_str(data),
                    Stream::Stderr => entry.1.push_str(data),
                }
            }
            Event::RunEnd { .. } => self.write_report()?,
            _ => {}
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.write_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SharedBuffer;

    fn events() -> Vec<Event> {
        let ctx = |path: &str, name: &str| Event::ContextEnter {
            run_id: "r".into(),
            path: path.into(),
            name: name.into(),
            timestamp: String::new(),
        };
        let enter = |path: &str, name: &str| Event::ScenarioEnter {
            run_id: "r".into(),
            path: path.into(),
            name: name.into(),
            timestamp: String::new(),
        };
        let exit = |path: &str, status| Event::ScenarioExit {
            run_id: "r".into(),
            path: path.into(),
            status,
            timestamp: String::new(),
        };
        vec![
            ctx("", "Suite"),
            enter("ok", "passes"),
            exit("ok", Status::Pass),
            enter("group", "group"),
            enter("group/bad", "fails <badly>"),
            Event::Output {
                run_id: "r".into(),
                path: "group/bad".into(),
                stream: Stream::Stdout,
                data: "expected & got\n".into(),
                timestamp: String::new(),
            },
            exit("group/bad", Status::Fail),
            enter("group/later", "later"),
            exit("group/later", Status::Skip),
            exit("group", Status::Fail),
            Event::ContextExit {
                run_id: "r".into(),
                path: String::new(),
                status: Status::Fail,
                timestamp: String::new(),
            },
            Event::RunEnd {
                run_id: "r".into(),
                status: Status::Fail,
                passed: 1,
                failed: 1,
                skipped: 1,
                timestamp: String::new(),
            },
        ]
    }

    #[test]
    fn test_report_structure() {
        let buffer = SharedBuffer::new();
        let mut sink = JunitSink::new(Box::new(buffer.clone()));
        for event in events() {
            sink.emit(&event).unwrap();
        }
        sink.finish().unwrap();

        let xml = buffer.contents();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<testsuites tests=\"3\" failures=\"1\" skipped=\"1\">"));
        assert!(xml.contains("<testsuite name=\"Suite\" tests=\"3\""));
        assert!(xml.contains("<testcase name=\"passes\" classname=\"root\"/>"));
        assert!(xml.contains("<testcase name=\"fails &lt;badly&gt;\" classname=\"group\">"));
        assert!(xml.contains("<failure message=\"scenario failed\">expected &amp; got\n</failure>"));
        assert!(xml.contains("<skipped/>"));
        // the group itself is not a test case
        assert!(!xml.contains("<testcase name=\"group\""));
        // written once even though finish follows run_end
        assert_eq!(xml.matches("<testsuites").count(), 1);
    }

    #[test]
    fn test_escape_drops_control_characters() {
        assert_eq!(escape("a\u{1b}[31mb"), "a[31mb");
        assert_eq!(escape("'\"\t"), "&apos;&quot;\t");
    }

    #[test]
    fn test_to_file_creates_parent() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("reports/junit.xml");
        let mut sink = JunitSink::to_file(&target).unwrap();
        sink.finish().unwrap();
        let xml = std::fs::read_to_string(&target).unwrap();
        assert!(xml.contains("<testsuites tests=\"0\""));
    }
}
