// src/errors.rs

//! Crate-wide error type and result alias.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Target not found: {0}")]
    TargetNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Command failed with exit code {code:?}: {cmd}{}", stderr_suffix(.stderr))]
    CommandFailed {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out after {timeout:?}: {cmd}")]
    CommandTimeout { cmd: String, timeout: Duration },

    #[error("Command output exceeded {limit} bytes: {cmd}")]
    OutputLimitExceeded { cmd: String, limit: usize },
}

fn stderr_suffix(stderr: &str) -> String {
    let first = stderr.lines().map(str::trim).find(|l| !l.is_empty());
    match first {
        Some(line) => format!(" ({line})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
