// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The [`CommandRunner`](super::CommandRunner) talks to a `ProcessBackend`
//! instead of spawning processes directly. Production code uses
//! [`RealProcessBackend`]; tests swap in a scripted backend that answers
//! commands from a table and records what was asked of it.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::{ReconError, Result};

/// How long to wait for the output readers once the child is gone.
const READER_GRACE: Duration = Duration::from_secs(2);

/// A fully resolved invocation: absolute program path plus argv.
///
/// Arguments are passed to the program directly; nothing is interpreted by a
/// shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// File name of the program, e.g. `dig` for `/usr/bin/dig`.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Human readable command line used in activity logs and errors.
    pub fn display(&self) -> String {
        let mut out = self.program_name();
        for arg in &self.args {
            out.push(' ');
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                out.push('\'');
                out.push_str(arg);
                out.push('\'');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Why the process stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited on its own; `None` when killed by a signal.
    Exited(Option<i32>),
    /// Killed after exceeding its timeout.
    TimedOut,
    /// Killed after exceeding the output ceiling.
    OutputLimit,
}

/// Everything captured from a single process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
    /// At least one stream was cut at the output ceiling.
    pub truncated: bool,
}

/// Trait abstracting how commands are executed.
pub trait ProcessBackend: Send + Sync {
    /// Run `spec` to completion, timeout or output overflow.
    ///
    /// `Err` is reserved for failures to start the process at all; timeouts,
    /// overflow and non-zero exits are reported through [`Termination`].
    fn execute<'a>(
        &'a self,
        spec: &'a CommandSpec,
        max_output: usize,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + 'a>>;
}

/// Backend that spawns real OS processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealProcessBackend;

impl ProcessBackend for RealProcessBackend {
    fn execute<'a>(
        &'a self,
        spec: &'a CommandSpec,
        max_output: usize,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + 'a>> {
        Box::pin(run_process(spec, max_output))
    }
}

async fn run_process(spec: &CommandSpec, max_output: usize) -> Result<ProcessOutput> {
    debug!(cmd = %spec.display(), timeout = ?spec.timeout, "spawning process");

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReconError::ToolNotFound(spec.program.display().to_string())
            } else {
                ReconError::Io(e)
            }
        })?;

    let overflow = Arc::new(Notify::new());
    let stdout_task = child
        .stdout
        .take()
        .map(|s| tokio::spawn(read_capped(s, max_output, overflow.clone())));
    let stderr_task = child
        .stderr
        .take()
        .map(|s| tokio::spawn(read_capped(s, max_output, overflow.clone())));

    let termination = tokio::select! {
        status = child.wait() => Termination::Exited(status?.code()),
        _ = tokio::time::sleep(spec.timeout) => Termination::TimedOut,
        _ = overflow.notified() => Termination::OutputLimit,
    };

    if !matches!(termination, Termination::Exited(_)) {
        // kill() also waits, so the child is reaped here.
        if let Err(e) = child.kill().await {
            warn!(cmd = %spec.display(), error = %e, "failed to kill child process");
        }
    }

    let (stdout, out_truncated) = collect_stream(stdout_task).await;
    let (stderr, err_truncated) = collect_stream(stderr_task).await;

    debug!(cmd = %spec.display(), ?termination, "process finished");

    Ok(ProcessOutput {
        termination,
        stdout,
        stderr,
        truncated: out_truncated || err_truncated,
    })
}

/// Read a stream until EOF or until `limit` bytes have been kept.
async fn read_capped<R>(mut reader: R, limit: usize, overflow: Arc<Notify>) -> (Vec<u8>, bool)
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                if n > room {
                    kept.extend_from_slice(&chunk[..room]);
                    overflow.notify_one();
                    return (kept, true);
                }
                kept.extend_from_slice(&chunk[..n]);
            }
            Err(e) => {
                debug!(error = %e, "output stream read error");
                break;
            }
        }
    }

    (kept, false)
}

async fn collect_stream(task: Option<JoinHandle<(Vec<u8>, bool)>>) -> (String, bool) {
    let Some(mut handle) = task else {
        return (String::new(), false);
    };

    match timeout(READER_GRACE, &mut handle).await {
        Ok(Ok((bytes, truncated))) => (String::from_utf8_lossy(&bytes).into_owned(), truncated),
        Ok(Err(e)) => {
            warn!(error = %e, "output reader task failed");
            (String::new(), false)
        }
        Err(_) => {
            // A grandchild still holds the pipe open.
            handle.abort();
            (String::new(), false)
        }
    }
}
