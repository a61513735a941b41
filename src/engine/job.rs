// src/engine/job.rs

//! Per-job state machine.
//!
//! [`JobState`] is synchronous and does no IO: the pipeline worker and the
//! control operations (`stop`, `pause`, `resume`) both mutate it under the
//! [`LiveJob`] mutex and publish events from inside that critical section,
//! which is what keeps the event stream consistent with the state.
//!
//! `status` moves `running -> completed | failed | stopped`; `paused` is an
//! orthogonal flag honoured at stage boundaries only.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::JobLogger;
use crate::store::Target;
use crate::types::{JobStatus, Profile, Stage, StageStatus, TargetType};

use super::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageProgress {
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Consistent, owned view of a live job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub target_id: i64,
    pub target: String,
    pub target_type: TargetType,
    pub profile: Profile,
    pub status: JobStatus,
    pub paused: bool,
    pub current_stage: Option<Stage>,
    pub stages: BTreeMap<Stage, StageProgress>,
    pub started_at: DateTime<Utc>,
}

/// Result of a boundary check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Proceed,
    /// The worker must return; it is no longer considered active.
    Halt,
}

/// What `resume` requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    /// Job was not paused (or is terminal); nothing happened.
    NotPaused,
    /// The worker has not reached a boundary yet and simply carries on.
    Continue,
    /// The worker already returned; the caller must spawn a new one.
    SpawnWorker,
}

#[derive(Debug, Clone)]
pub struct JobState {
    snapshot: JobSnapshot,
    worker_active: bool,
}

impl JobState {
    /// New running job with every stage queued and a worker about to start.
    pub fn new(job_id: impl Into<JobId>, target: &Target, profile: Profile, started_at: DateTime<Utc>) -> Self {
        let stages = Stage::ALL
            .iter()
            .map(|s| {
                (
                    *s,
                    StageProgress {
                        status: StageStatus::Queued,
                        count: None,
                    },
                )
            })
            .collect();

        Self {
            snapshot: JobSnapshot {
                job_id: job_id.into(),
                target_id: target.id,
                target: target.value.clone(),
                target_type: target.target_type,
                profile,
                status: JobStatus::Running,
                paused: false,
                current_stage: None,
                stages,
                started_at,
            },
            worker_active: true,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.snapshot.clone()
    }

    pub fn job_id(&self) -> &str {
        &self.snapshot.job_id
    }

    pub fn profile(&self) -> Profile {
        self.snapshot.profile
    }

    pub fn status(&self) -> JobStatus {
        self.snapshot.status
    }

    pub fn is_paused(&self) -> bool {
        self.snapshot.paused
    }

    pub fn worker_active(&self) -> bool {
        self.worker_active
    }

    pub fn stage_status(&self, stage: Stage) -> StageStatus {
        self.snapshot
            .stages
            .get(&stage)
            .map(|p| p.status)
            .unwrap_or(StageStatus::Queued)
    }

    fn can_proceed(&self) -> bool {
        self.snapshot.status == JobStatus::Running && !self.snapshot.paused
    }

    /// Check taken before every stage.
    pub fn enter_boundary(&mut self) -> Boundary {
        if self.can_proceed() {
            Boundary::Proceed
        } else {
            self.worker_active = false;
            Boundary::Halt
        }
    }

    /// A refused stage transition ends the worker just like a halted boundary.
    fn refuse(&mut self) -> bool {
        self.worker_active = false;
        false
    }

    fn set_stage(&mut self, stage: Stage, status: StageStatus, count: Option<usize>) {
        self.snapshot.stages.insert(stage, StageProgress { status, count });
    }

    /// Returns `false` unless the job may proceed. The caller's worker must
    /// then exit; a later resume spawns a fresh one.
    pub fn mark_running(&mut self, stage: Stage) -> bool {
        if !self.can_proceed() {
            return self.refuse();
        }
        self.snapshot.current_stage = Some(stage);
        self.set_stage(stage, StageStatus::Running, None);
        true
    }

    /// A stage that was started may finish while paused, but never once the
    /// job left `running`.
    pub fn mark_done(&mut self, stage: Stage, count: usize) -> bool {
        if self.snapshot.status != JobStatus::Running {
            return self.refuse();
        }
        self.set_stage(stage, StageStatus::Done, Some(count));
        true
    }

    pub fn mark_skipped(&mut self, stage: Stage) -> bool {
        if !self.can_proceed() {
            return self.refuse();
        }
        self.snapshot.current_stage = Some(stage);
        self.set_stage(stage, StageStatus::Skipped, Some(0));
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.can_proceed() {
            return false;
        }
        self.snapshot.paused = true;
        true
    }

    pub fn resume(&mut self) -> ResumeAction {
        if self.snapshot.status != JobStatus::Running || !self.snapshot.paused {
            return ResumeAction::NotPaused;
        }
        self.snapshot.paused = false;
        if self.worker_active {
            ResumeAction::Continue
        } else {
            self.worker_active = true;
            ResumeAction::SpawnWorker
        }
    }

    fn finish(&mut self, status: JobStatus) -> bool {
        if self.snapshot.status.is_terminal() {
            return false;
        }
        self.snapshot.status = status;
        true
    }

    pub fn stop(&mut self) -> bool {
        self.finish(JobStatus::Stopped)
    }

    pub fn fail(&mut self) -> bool {
        let changed = self.finish(JobStatus::Failed);
        if changed {
            self.worker_active = false;
        }
        changed
    }

    pub fn complete(&mut self) -> bool {
        if self.snapshot.status != JobStatus::Running {
            return false;
        }
        self.snapshot.status = JobStatus::Completed;
        self.snapshot.current_stage = None;
        self.worker_active = false;
        true
    }
}

/// A registered job: its state plus what the worker needs to drive it.
#[derive(Debug)]
pub struct LiveJob {
    state: Mutex<JobState>,
    target: Target,
    log: JobLogger,
}

impl LiveJob {
    pub fn new(state: JobState, target: Target, log: JobLogger) -> Self {
        Self {
            state: Mutex::new(state),
            target,
            log,
        }
    }

    /// Run `f` with exclusive access to the state.
    pub fn with<R>(&self, f: impl FnOnce(&mut JobState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.with(|s| s.snapshot())
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn log(&self) -> &JobLogger {
        &self.log
    }

    pub fn job_id(&self) -> &str {
        self.log.job_id()
    }
}
