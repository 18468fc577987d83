//! Phase subprocess execution
//!
//! Each phase runs in its own process group. Stdout and stderr are drained by
//! two reader tasks feeding one channel, so a child blocked on one pipe never
//! starves the other. A deadline bounds both the draining and the wait.
//!
//! Captured streams keep the exact bytes the child wrote. Only the chunks
//! handed to the output callback are decoded, for display.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::common::Error;
use crate::event::Stream;

/// Exit code reported when a phase exceeds its deadline
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code reported when a phase could not be started
pub const EXIT_SPAWN_FAILED: i32 = 127;

const READ_CHUNK: usize = 8192;

/// How long the readers get to hand over buffered output after a kill
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Fully resolved invocation of one phase
#[derive(Debug, Clone)]
pub struct PhaseCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete child environment; the parent's is not inherited
    pub env: BTreeMap<String, String>,
    pub stdin: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl PhaseCommand {
    /// `sh -c <script>`
    pub fn shell(script: &str, cwd: PathBuf, env: BTreeMap<String, String>) -> Self {
        Self {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string()],
            cwd,
            env,
            stdin: None,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Everything one phase produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl CapturedOutput {
    fn append(&mut self, stream: Stream, bytes: &[u8]) {
        match stream {
            Stream::Stdout => self.stdout.extend_from_slice(bytes),
            Stream::Stderr => self.stderr.extend_from_slice(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub output: CapturedOutput,
    pub timed_out: bool,
}

/// Run a phase to completion, reporting each decoded chunk as it arrives
pub async fn execute<F>(command: &PhaseCommand, mut on_output: F) -> PhaseOutcome
where
    F: FnMut(Stream, &str),
{
    let mut child = match spawn(command) {
        Ok(child) => child,
        Err(e) => {
            let message = format!("{}\n", e);
            on_output(Stream::Stderr, &message);
            return PhaseOutcome {
                output: CapturedOutput {
                    stdout: Vec::new(),
                    stderr: message.into_bytes(),
                    exit_code: EXIT_SPAWN_FAILED,
                },
                timed_out: false,
            };
        }
    };
    tracing::debug!(program = %command.program.display(), pid = ?child.id(), "Spawned phase");

    if let (Some(mut pipe), Some(data)) = (child.stdin.take(), command.stdin.clone()) {
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(&data).await {
                tracing::debug!("Phase closed stdin early: {}", e);
            }
            // dropping the pipe delivers EOF
        });
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_reader(child.stdout.take(), Stream::Stdout, tx.clone());
    spawn_reader(child.stderr.take(), Stream::Stderr, tx);

    let deadline = command.timeout.map(|limit| Instant::now() + limit);
    let mut output = CapturedOutput::default();
    let mut decoders = [Utf8Decoder::default(), Utf8Decoder::default()];
    let mut deliver = |stream: Stream, bytes: &[u8], output: &mut CapturedOutput| {
        output.append(stream, bytes);
        let text = decoders[stream_slot(stream)].push(bytes);
        if !text.is_empty() {
            on_output(stream, &text);
        }
    };

    let mut timed_out = false;
    loop {
        let next = match deadline {
            Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            },
            None => rx.recv().await,
        };
        match next {
            Some((stream, bytes)) => deliver(stream, &bytes, &mut output),
            None => break,
        }
    }

    let status = if timed_out {
        None
    } else {
        match deadline {
            Some(at) => match tokio::time::timeout_at(at, child.wait()).await {
                Ok(status) => status.ok(),
                Err(_) => {
                    timed_out = true;
                    None
                }
            },
            None => child.wait().await.ok(),
        }
    };

    if timed_out {
        kill_group(&mut child).await;
        // The readers finish once every holder of the pipes is dead
        let grace = Instant::now() + DRAIN_GRACE;
        while let Ok(Some((stream, bytes))) = tokio::time::timeout_at(grace, rx.recv()).await {
            deliver(stream, &bytes, &mut output);
        }
    }

    for stream in [Stream::Stdout, Stream::Stderr] {
        let rest = decoders[stream_slot(stream)].finish();
        if !rest.is_empty() {
            on_output(stream, &rest);
        }
    }

    output.exit_code = match status {
        _ if timed_out => EXIT_TIMEOUT,
        Some(status) => exit_code(status),
        None => EXIT_SPAWN_FAILED,
    };
    tracing::debug!(exit_code = output.exit_code, timed_out, "Phase finished");

    PhaseOutcome { output, timed_out }
}

fn spawn(command: &PhaseCommand) -> crate::common::Result<Child> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .current_dir(&command.cwd)
        .env_clear()
        .envs(&command.env)
        .stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd.spawn()
        .map_err(|e| Error::spawn(&command.program.display().to_string(), e))
}

fn spawn_reader<R>(pipe: Option<R>, stream: Stream, tx: mpsc::UnboundedSender<(Stream, Vec<u8>)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(mut pipe) = pipe else {
        return;
    };
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(stream = stream.as_str(), "Pipe read failed: {}", e);
                    break;
                }
            }
        }
    });
}

fn stream_slot(stream: Stream) -> usize {
    match stream {
        Stream::Stdout => 0,
        Stream::Stderr => 1,
    }
}

/// Kill the child's whole process group, then reap the child
async fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: killpg only sends a signal; the group was created at spawn
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            tracing::warn!(pid, "Failed to kill process group: {}", std::io::Error::last_os_error());
        }
    }
    if let Err(e) = child.kill().await {
        tracing::debug!("Child already gone: {}", e);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Incremental UTF-8 decoding that holds back a split trailing sequence
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid + len;
                        }
                        None => {
                            start = valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
        out
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
