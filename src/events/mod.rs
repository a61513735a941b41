// src/events/mod.rs

//! Job events and their fan-out.
//!
//! Every observable change of a job is a [`ReconEvent`]. The pipeline only
//! sees the [`EventSink`] trait; production wires in an [`EventBus`] backed by
//! a `tokio::sync::broadcast` channel so any number of observers can follow
//! along. Activity lines go through [`JobLogger`], which also persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::engine::JobId;
use crate::types::{ActivityLevel, Stage, StageStatus};

pub mod activity;

pub use activity::{ActivitySink, JobLogger};

/// Default broadcast buffer per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ReconEvent {
    Activity {
        job_id: JobId,
        message: String,
        level: ActivityLevel,
        timestamp: DateTime<Utc>,
    },
    StageUpdate {
        job_id: JobId,
        stage: Stage,
        status: StageStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<usize>,
    },
    JobComplete {
        job_id: JobId,
    },
    JobError {
        job_id: JobId,
        error: String,
    },
    JobStopped {
        job_id: JobId,
    },
    JobPaused {
        job_id: JobId,
    },
    JobResumed {
        job_id: JobId,
    },
}

impl ReconEvent {
    pub fn job_id(&self) -> &str {
        match self {
            ReconEvent::Activity { job_id, .. }
            | ReconEvent::StageUpdate { job_id, .. }
            | ReconEvent::JobComplete { job_id }
            | ReconEvent::JobError { job_id, .. }
            | ReconEvent::JobStopped { job_id }
            | ReconEvent::JobPaused { job_id }
            | ReconEvent::JobResumed { job_id } => job_id,
        }
    }

    /// Complete, error and stopped end a job's event stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconEvent::JobComplete { .. } | ReconEvent::JobError { .. } | ReconEvent::JobStopped { .. }
        )
    }
}

/// Fire-and-forget destination for job events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ReconEvent);
}

/// Broadcast fan-out to every current subscriber.
///
/// Events published while nobody is subscribed are dropped; late observers
/// read history from the store instead.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReconEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReconEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: ReconEvent) {
        if self.tx.send(event).is_err() {
            trace!(target: "event_bus", "no subscribers");
        }
    }
}
