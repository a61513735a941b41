use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reconpipe::errors::{ReconError, Result};
use reconpipe::exec::{CommandSpec, ProcessBackend, ProcessOutput, Termination};
use tokio::sync::Notify;

/// What a scripted command does.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Exit with `code` after printing `stdout` / `stderr`.
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// Behave as if the command hit its timeout.
    Timeout,
    /// Print `stdout` until the output ceiling is hit.
    Flood { stdout: String },
    /// Fail to spawn.
    SpawnError,
}

impl Reply {
    pub fn stdout(stdout: &str) -> Self {
        Reply::Exit {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: &str) -> Self {
        Reply::Exit {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// One-shot barrier: the first matching command blocks inside the backend
/// until the test calls [`Gate::release`].
#[derive(Debug, Clone, Default)]
pub struct Gate {
    armed: Arc<AtomicBool>,
    entered: Arc<Notify>,
    released: Arc<Notify>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            armed: Arc::new(AtomicBool::new(true)),
            ..Self::default()
        }
    }

    /// Wait until a command reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.released.notified().await;
        }
    }
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program file name, e.g. `dig`.
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a.contains(needle))
    }
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    arg_contains: Option<String>,
    reply: Reply,
    gate: Option<Gate>,
}

impl Rule {
    fn matches(&self, program: &str, args: &[String]) -> bool {
        self.program == program
            && self
                .arg_contains
                .as_deref()
                .is_none_or(|needle| args.iter().any(|a| a.contains(needle)))
    }
}

/// A fake `ProcessBackend` that:
/// - answers commands from a rule table keyed by program name and an
///   optional argument substring (the most recently added match wins)
/// - records every invocation
/// - exits 0 with empty output when no rule matches.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, program: &str, arg_contains: Option<&str>, reply: Reply) -> &Self {
        self.push(program, arg_contains, reply, None)
    }

    /// Like [`ScriptedBackend::on`], but the first matching call waits on `gate`.
    pub fn on_gated(&self, program: &str, arg_contains: Option<&str>, reply: Reply, gate: &Gate) -> &Self {
        self.push(program, arg_contains, reply, Some(gate.clone()))
    }

    fn push(&self, program: &str, arg_contains: Option<&str>, reply: Reply, gate: Option<Gate>) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            arg_contains: arg_contains.map(str::to_string),
            reply,
            gate,
        });
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }
}

impl ProcessBackend for ScriptedBackend {
    fn execute<'a>(
        &'a self,
        spec: &'a CommandSpec,
        max_output: usize,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + 'a>> {
        Box::pin(async move {
            let program = spec.program_name();
            self.calls.lock().unwrap().push(Invocation {
                program: program.clone(),
                args: spec.args.clone(),
            });

            let rule = {
                let rules = self.rules.lock().unwrap();
                rules.iter().rev().find(|r| r.matches(&program, &spec.args)).cloned()
            };
            let Some(rule) = rule else {
                return Ok(ProcessOutput {
                    termination: Termination::Exited(Some(0)),
                    stdout: String::new(),
                    stderr: String::new(),
                    truncated: false,
                });
            };

            if let Some(gate) = &rule.gate {
                gate.pass().await;
            }

            match rule.reply {
                Reply::Exit { code, stdout, stderr } => Ok(ProcessOutput {
                    termination: Termination::Exited(Some(code)),
                    stdout,
                    stderr,
                    truncated: false,
                }),
                Reply::Timeout => Ok(ProcessOutput {
                    termination: Termination::TimedOut,
                    stdout: String::new(),
                    stderr: String::new(),
                    truncated: false,
                }),
                Reply::Flood { stdout } => Ok(ProcessOutput {
                    termination: Termination::OutputLimit,
                    stdout: stdout.chars().take(max_output).collect(),
                    stderr: String::new(),
                    truncated: true,
                }),
                Reply::SpawnError => Err(ReconError::ToolNotFound(spec.program.display().to_string())),
            }
        })
    }
}
