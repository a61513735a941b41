// src/engine/registry.rs

//! Live job table with a persisted fallback for finished jobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::store::{JobRecord, Store};

use super::JobId;
use super::job::{JobSnapshot, LiveJob};

/// What `status` can report about a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "job", rename_all = "lowercase")]
pub enum JobView {
    Live(JobSnapshot),
    Persisted(JobRecord),
}

pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Arc<LiveJob>>>,
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("live", &self.live_ids())
            .finish_non_exhaustive()
    }
}

impl JobRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            store,
        }
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobId, Arc<LiveJob>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self, job: Arc<LiveJob>) {
        debug!(job_id = job.job_id(), "registering job");
        self.jobs().insert(job.job_id().to_string(), job);
    }

    pub(crate) fn unregister(&self, job_id: &str) {
        debug!(job_id, "unregistering job");
        self.jobs().remove(job_id);
    }

    pub fn live(&self, job_id: &str) -> Option<Arc<LiveJob>> {
        self.jobs().get(job_id).cloned()
    }

    pub fn is_live(&self, job_id: &str) -> bool {
        self.jobs().contains_key(job_id)
    }

    pub fn live_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Live snapshot if registered, else the persisted row, else `None`.
    pub fn get(&self, job_id: &str) -> Result<Option<JobView>> {
        if let Some(job) = self.live(job_id) {
            return Ok(Some(JobView::Live(job.snapshot())));
        }
        Ok(self.store.get_job(job_id)?.map(JobView::Persisted))
    }
}
