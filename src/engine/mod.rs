// src/engine/mod.rs

//! Job orchestration engine.
//!
//! This module ties together:
//! - the applicability table deciding which stages run ([`policy`])
//! - the per-job state machine ([`job`])
//! - the registry of live jobs ([`registry`])
//! - the per-job worker that walks the stages ([`pipeline`])
//! - the public control surface ([`orchestrator`])
//!
//! The pure pieces (`policy`, `job`) do no IO and are unit tested directly;
//! the async shell lives in `pipeline`.

/// Canonical job identifier type used throughout the engine.
pub type JobId = String;

pub mod job;
pub mod orchestrator;
pub(crate) mod pipeline;
pub mod policy;
pub mod registry;

pub use job::{Boundary, JobSnapshot, JobState, LiveJob, ResumeAction, StageProgress};
pub use orchestrator::Orchestrator;
pub use policy::{Applicability, SkipReason, StagePolicy};
pub use registry::{JobRegistry, JobView};
