//! cleartool::executor
//!
//! The boundary where `cleartool` actually runs.
//!
//! # Error classification
//!
//! `cleartool` reports a missing object only through its message text. The
//! text is inspected exactly once, here, by [`classify`]: a failure whose
//! output mentions one of [`NOT_FOUND_MARKERS`] becomes
//! [`CleartoolError::NotFound`], every other failure becomes
//! [`CleartoolError::CommandFailed`]. The markers are tied to the wording of
//! the installed ClearCase release and may stop matching after an upgrade.
//!
//! # Invocation ids
//!
//! Each [`ProcessExecutor`] numbers its invocations from 1. The id is
//! recorded on the tracing span of the invocation so the log lines of one
//! command can be told apart from the next.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info_span, warn};

use super::request::CommandRequest;

/// Case-insensitive phrases that mean "the object does not exist".
pub const NOT_FOUND_MARKERS: [&str; 2] = ["stream not found", "no matching entries found"];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from running `cleartool`.
#[derive(Debug, Error)]
pub enum CleartoolError {
    /// The command failed because the object it names does not exist.
    #[error("not found: {command_line}: {output}")]
    NotFound {
        command_line: String,
        output: String,
    },

    /// The command exited non-zero for any other reason.
    #[error("command failed (exit {exit_code}): {command_line}\n{output}")]
    CommandFailed {
        command_line: String,
        exit_code: i32,
        output: String,
    },

    /// The program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// Waiting for the process failed.
    #[error("failed waiting for {command_line}: {source}")]
    Wait {
        command_line: String,
        source: std::io::Error,
    },

    /// The command ran longer than the configured timeout and was killed.
    #[error("timed out after {seconds}s: {command_line}")]
    Timeout { command_line: String, seconds: u64 },
}

impl CleartoolError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CleartoolError::NotFound { .. })
    }
}

/// Captured result of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful invocation printing `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Runs `cleartool` requests.
///
/// This is the only seam between ccsync and the external tool; everything
/// above it works with [`CommandOutput`] and [`CleartoolError`].
pub trait Executor {
    /// Run `request`.
    ///
    /// When `request.fail_on_error` is set a non-zero exit is returned as an
    /// error; otherwise the output is returned whatever the exit code.
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, CleartoolError>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, CleartoolError> {
        (**self).run(request)
    }
}

/// Turn a raw invocation result into the executor contract.
pub fn classify(request: &CommandRequest, output: CommandOutput) -> Result<CommandOutput, CleartoolError> {
    if output.success() || !request.fail_on_error {
        return Ok(output);
    }

    let text = output.combined();
    let lowered = text.to_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Err(CleartoolError::NotFound {
            command_line: request.command_line(),
            output: text,
        });
    }

    Err(CleartoolError::CommandFailed {
        command_line: request.command_line(),
        exit_code: output.exit_code,
        output: text,
    })
}

/// Executor backed by a real `cleartool` process.
#[derive(Debug)]
pub struct ProcessExecutor {
    program: PathBuf,
    timeout: Option<Duration>,
    next_id: AtomicU64,
}

impl ProcessExecutor {
    /// Use `cleartool` from `PATH`, or from `tool_home` when given.
    pub fn new(tool_home: Option<&Path>) -> Self {
        let program = match tool_home {
            Some(home) => home.join("cleartool"),
            None => PathBuf::from("cleartool"),
        };
        Self::with_program(program)
    }

    /// Use an explicit program path.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Kill invocations that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn wait(&self, child: &mut Child, request: &CommandRequest) -> Result<ExitStatus, CleartoolError> {
        let wait_error = |source: std::io::Error| CleartoolError::Wait {
            command_line: request.command_line(),
            source,
        };

        let Some(limit) = self.timeout else {
            return child.wait().map_err(wait_error);
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(status);
            }
            if started.elapsed() >= limit {
                warn!(seconds = limit.as_secs(), "command timed out, killing");
                let _ = child.kill();
                let _ = child.wait();
                return Err(CleartoolError::Timeout {
                    command_line: request.command_line(),
                    seconds: limit.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(None)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl Executor for ProcessExecutor {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, CleartoolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("cleartool", invocation = id, subcommand = request.subcommand());
        let _guard = span.enter();

        let mut command = Command::new(&self.program);
        command
            .arg(request.subcommand())
            .args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = request.working_dir.as_deref().filter(|d| d.is_dir()) {
            command.current_dir(dir);
        }

        debug!(command = %request.command_line(), dir = ?request.working_dir, "running");

        let mut child = command.spawn().map_err(|source| CleartoolError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = self.wait(&mut child, request)?;

        let output = CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };
        debug!(exit_code = output.exit_code, bytes = output.stdout.len(), "finished");

        classify(request, output)
    }
}
