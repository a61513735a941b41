// src/events/activity.rs

//! Activity log: persisted, broadcast and mirrored to `tracing`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::engine::JobId;
use crate::store::{ActivityEntry, Store};
use crate::types::ActivityLevel;

use super::{EventSink, ReconEvent};

/// Writes activity lines for any job.
pub struct ActivitySink {
    store: Arc<dyn Store>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ActivitySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivitySink").finish_non_exhaustive()
    }
}

impl ActivitySink {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    /// Record one activity line.
    ///
    /// A failed insert is logged and otherwise ignored; the event is still
    /// published.
    pub fn record(&self, job_id: &str, level: ActivityLevel, message: String) {
        let entry = ActivityEntry {
            job_id: job_id.to_string(),
            level,
            message,
            timestamp: Utc::now(),
        };

        if let Err(err) = self.store.append_activity(&entry) {
            error!(job_id, error = %err, "failed to persist activity line");
        }

        match level {
            ActivityLevel::Error => error!(job_id, "{}", entry.message),
            ActivityLevel::Warning => warn!(job_id, "{}", entry.message),
            ActivityLevel::Info | ActivityLevel::Success => info!(job_id, "{}", entry.message),
        }

        self.events.publish(ReconEvent::Activity {
            job_id: entry.job_id,
            message: entry.message,
            level,
            timestamp: entry.timestamp,
        });
    }
}

/// Per-job handle handed to stage executors and the command runner.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    sink: Arc<ActivitySink>,
}

impl JobLogger {
    pub fn new(job_id: impl Into<JobId>, sink: Arc<ActivitySink>) -> Self {
        Self {
            job_id: job_id.into(),
            sink,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn log(&self, level: ActivityLevel, message: impl Into<String>) {
        self.sink.record(&self.job_id, level, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(ActivityLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(ActivityLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(ActivityLevel::Error, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(ActivityLevel::Success, message);
    }
}
