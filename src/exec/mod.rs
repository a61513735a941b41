// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`locator`] resolves logical tool names to executables on disk.
//! - [`backend`] provides the `ProcessBackend` trait and the
//!   `RealProcessBackend` that spawns OS processes with a timeout and an
//!   output ceiling, and which tests replace with a scripted implementation.
//! - [`runner`] wraps a backend with strict / allow-failure semantics and
//!   activity logging.

pub mod backend;
pub mod locator;
pub mod runner;

pub use backend::{CommandSpec, ProcessBackend, ProcessOutput, RealProcessBackend, Termination};
pub use locator::{Tool, ToolLocator, build_search_paths};
pub use runner::{CommandOutput, CommandRunner, RunMode, format_output};
