// src/exec/runner.rs

//! Command runner: executes a [`CommandSpec`] through a [`ProcessBackend`]
//! and mirrors what happened into the job's activity log.

use std::sync::Arc;

use tracing::debug;

use crate::errors::{ReconError, Result};
use crate::events::JobLogger;

use super::backend::{CommandSpec, ProcessBackend, ProcessOutput, Termination};

/// How failures are reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Non-zero exit, timeout and output overflow are returned as `Err`.
    Strict,
    /// Whatever was captured is returned as `Ok`; the failure is only logged.
    AllowFailure,
}

/// Result of a command run as seen by stage executors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub truncated: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out && !self.truncated
    }

    /// Non-empty, trimmed stdout lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

#[derive(Clone)]
pub struct CommandRunner {
    backend: Arc<dyn ProcessBackend>,
    max_output_bytes: usize,
    log_chars: usize,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("max_output_bytes", &self.max_output_bytes)
            .field("log_chars", &self.log_chars)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    pub fn new(backend: Arc<dyn ProcessBackend>, max_output_bytes: usize, log_chars: usize) -> Self {
        Self {
            backend,
            max_output_bytes,
            log_chars,
        }
    }

    pub async fn run(&self, spec: &CommandSpec, mode: RunMode, log: &JobLogger) -> Result<CommandOutput> {
        let cmd = spec.display();
        log.info(format!("CMD: {cmd}"));

        let raw = match self.backend.execute(spec, self.max_output_bytes).await {
            Ok(raw) => raw,
            Err(err) => {
                return match mode {
                    RunMode::Strict => {
                        log.error(format!("CMD failed: {cmd} ({err})"));
                        Err(err)
                    }
                    RunMode::AllowFailure => {
                        log.warn(format!("CMD failed: {cmd} ({err})"));
                        Ok(CommandOutput {
                            stderr: err.to_string(),
                            ..CommandOutput::default()
                        })
                    }
                };
            }
        };

        if !raw.stdout.trim().is_empty() {
            log.info(format_output("STDOUT", &raw.stdout, self.log_chars));
        }
        if !raw.stderr.trim().is_empty() {
            log.warn(format_output("STDERR", &raw.stderr, self.log_chars));
        }

        let failure = classify_failure(spec, &raw, self.max_output_bytes);
        let output = CommandOutput {
            exit_code: match raw.termination {
                Termination::Exited(code) => code,
                _ => None,
            },
            timed_out: raw.termination == Termination::TimedOut,
            truncated: raw.truncated || raw.termination == Termination::OutputLimit,
            stdout: raw.stdout,
            stderr: raw.stderr,
        };

        debug!(cmd = %cmd, exit_code = ?output.exit_code, timed_out = output.timed_out, "command finished");

        match (failure, mode) {
            (None, _) => Ok(output),
            (Some(err), RunMode::Strict) => {
                log.error(format!("CMD failed: {err}"));
                Err(err)
            }
            (Some(err), RunMode::AllowFailure) => {
                log.warn(format!("CMD failed: {err}"));
                Ok(output)
            }
        }
    }
}

fn classify_failure(spec: &CommandSpec, raw: &ProcessOutput, limit: usize) -> Option<ReconError> {
    let cmd = spec.display();
    match raw.termination {
        Termination::TimedOut => Some(ReconError::CommandTimeout {
            cmd,
            timeout: spec.timeout,
        }),
        Termination::OutputLimit => Some(ReconError::OutputLimitExceeded { cmd, limit }),
        _ if raw.truncated => Some(ReconError::OutputLimitExceeded { cmd, limit }),
        Termination::Exited(Some(0)) => None,
        Termination::Exited(code) => Some(ReconError::CommandFailed {
            cmd,
            code,
            stderr: raw.stderr.clone(),
        }),
    }
}

/// Render a captured stream for the activity log, capped at `max_chars`.
pub fn format_output(label: &str, text: &str, max_chars: usize) -> String {
    let text = text.trim_end();
    if text.chars().count() <= max_chars {
        return format!("{label}:\n{text}");
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{label} (truncated):\n{head}\n...")
}
