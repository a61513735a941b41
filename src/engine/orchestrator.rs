// src/engine/orchestrator.rs

//! Public control surface: start, stop, pause, resume and status.
//!
//! All dependencies are passed in at construction; there is no global job
//! table and no late wiring of the event sink.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ReconConfig;
use crate::errors::{ReconError, Result};
use crate::events::{ActivitySink, EventSink, JobLogger, ReconEvent};
use crate::exec::{CommandRunner, ProcessBackend, Tool, ToolLocator};
use crate::stages::Toolkit;
use crate::store::{JobRecord, Store};
use crate::types::{JobStatus, Profile, Stage, TargetStatus, TargetType};

use super::JobId;
use super::job::{JobState, LiveJob, ResumeAction};
use super::pipeline::Pipeline;
use super::policy::Applicability;
use super::registry::{JobRegistry, JobView};

pub struct Orchestrator {
    store: Arc<dyn Store>,
    events: Arc<dyn EventSink>,
    activity: Arc<ActivitySink>,
    registry: Arc<JobRegistry>,
    pipeline: Arc<Pipeline>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        config: ReconConfig,
        store: Arc<dyn Store>,
        events: Arc<dyn EventSink>,
        backend: Arc<dyn ProcessBackend>,
        locator: Arc<ToolLocator>,
    ) -> Self {
        let config = Arc::new(config);
        let runner = CommandRunner::new(backend, config.limits.max_output_bytes, config.limits.log_output_chars);
        let policy = super::StagePolicy::new(config.custom_skip.clone());
        let registry = Arc::new(JobRegistry::new(Arc::clone(&store)));
        let activity = Arc::new(ActivitySink::new(Arc::clone(&store), Arc::clone(&events)));

        let pipeline = Arc::new(Pipeline {
            kit: Toolkit::new(runner, locator, config),
            store: Arc::clone(&store),
            events: Arc::clone(&events),
            registry: Arc::clone(&registry),
            policy,
        });

        Self {
            store,
            events,
            activity,
            registry,
            pipeline,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Start a job for a stored target and return its id immediately.
    ///
    /// The worker is spawned on the current Tokio runtime, so this must be
    /// called from within one.
    pub fn start(&self, target_id: i64, profile: Profile) -> Result<JobId> {
        let target = self
            .store
            .get_target(target_id)?
            .ok_or(ReconError::TargetNotFound(target_id))?;
        if target.value.trim().is_empty() {
            return Err(ReconError::InvalidInput(format!("target {target_id} has an empty value")));
        }

        let job_id = format!("job-{}", Uuid::new_v4().simple());
        let started_at = Utc::now();

        self.store.insert_job(&JobRecord {
            job_id: job_id.clone(),
            target_id,
            profile,
            status: JobStatus::Running,
            started_at,
            completed_at: None,
        })?;
        self.store
            .set_target_status(target_id, TargetStatus::Running, Some(started_at))?;

        let log = JobLogger::new(job_id.clone(), Arc::clone(&self.activity));
        let state = JobState::new(job_id.clone(), &target, profile, started_at);
        log.info(format!(
            "Started reconnaissance for {} ({}, {profile})",
            target.value, target.target_type
        ));
        self.log_tool_report(&log);

        let job = Arc::new(LiveJob::new(state, target, log));
        self.registry.register(Arc::clone(&job));
        self.pipeline.spawn(job);

        info!(job_id = %job_id, target_id, profile = %profile, "job started");
        Ok(job_id)
    }

    fn log_tool_report(&self, log: &JobLogger) {
        for (tool, path) in self.tool_report() {
            match path {
                Some(path) => log.info(format!("Tool check: {} -> {}", tool.name(), path.display())),
                None => log.warn(format!("Tool check: {} not found on PATH", tool.name())),
            }
        }
    }

    /// Stop a live job. Returns `false` when the job is not live.
    pub fn stop(&self, job_id: &str) -> Result<bool> {
        let Some(job) = self.registry.live(job_id) else {
            return Ok(false);
        };
        if !job.with(|s| s.stop()) {
            return Ok(false);
        }

        let persisted = self
            .store
            .set_job_status(job_id, JobStatus::Stopped, Some(Utc::now()))
            .and_then(|()| self.store.set_target_status(job.target().id, TargetStatus::Pending, None));

        job.log().warn("Reconnaissance stopped by user");
        self.registry.unregister(job_id);
        self.events.publish(ReconEvent::JobStopped {
            job_id: job_id.to_string(),
        });
        info!(job_id, "job stopped");

        persisted.map(|()| true)
    }

    /// Pause a live job at its next stage boundary.
    pub fn pause(&self, job_id: &str) -> Result<bool> {
        let Some(job) = self.registry.live(job_id) else {
            return Ok(false);
        };

        let paused = job.with(|s| -> Result<bool> {
            if !s.pause() {
                return Ok(false);
            }
            self.store.set_job_status(job_id, JobStatus::Paused, None)?;
            self.events.publish(ReconEvent::JobPaused {
                job_id: job_id.to_string(),
            });
            Ok(true)
        })?;

        if paused {
            job.log().info("Reconnaissance paused");
        }
        Ok(paused)
    }

    /// Resume a paused job from its first unfinished stage.
    pub fn resume(&self, job_id: &str) -> Result<bool> {
        let Some(job) = self.registry.live(job_id) else {
            return Ok(false);
        };

        let action = job.with(|s| -> Result<ResumeAction> {
            let action = s.resume();
            if action == ResumeAction::NotPaused {
                return Ok(action);
            }
            self.store.set_job_status(job_id, JobStatus::Running, None)?;
            self.events.publish(ReconEvent::JobResumed {
                job_id: job_id.to_string(),
            });
            Ok(action)
        })?;

        if action == ResumeAction::NotPaused {
            return Ok(false);
        }

        job.log().info("Reconnaissance resumed");
        if action == ResumeAction::SpawnWorker {
            self.pipeline.spawn(Arc::clone(&job));
        }
        Ok(true)
    }

    pub fn status(&self, job_id: &str) -> Result<Option<JobView>> {
        self.registry.get(job_id)
    }

    /// Resolution of every known tool on this host.
    pub fn tool_report(&self) -> Vec<(Tool, Option<PathBuf>)> {
        let report = self.pipeline.kit.locator.report();
        if report.iter().all(|(_, p)| p.is_none()) {
            warn!("no recon tools found on the search path");
        }
        report
    }

    /// Dry run of the applicability table.
    pub fn plan(&self, target_type: TargetType, profile: Profile) -> Vec<(Stage, Applicability)> {
        self.pipeline.policy.plan(target_type, profile)
    }
}
