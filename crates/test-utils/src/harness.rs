#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use reconpipe::config::ReconConfig;
use reconpipe::engine::{JobId, Orchestrator};
use reconpipe::events::{EventBus, ReconEvent};
use reconpipe::exec::ToolLocator;
use reconpipe::fs::mock::MockFileSystem;
use reconpipe::store::{NewTarget, SqliteStore, Store, Target};
use reconpipe::types::{Stage, StageStatus};
use tokio::sync::broadcast;

use crate::{HookedStore, ScriptedBackend};

pub const TOOL_DIR: &str = "/usr/bin";

/// An orchestrator over in-memory SQLite, a mock filesystem with the given
/// tools installed in [`TOOL_DIR`], and a [`ScriptedBackend`].
pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub bus: Arc<EventBus>,
    pub backend: Arc<ScriptedBackend>,
    pub fs: MockFileSystem,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(config: ReconConfig, tools: &[&str]) -> Self {
        Self::build(config, tools, |store| store as Arc<dyn Store>)
    }

    /// Like [`Harness::new`], but the orchestrator writes through a
    /// [`HookedStore`]. `store` still reads the same database directly.
    pub fn hooked(config: ReconConfig, tools: &[&str]) -> (Self, Arc<HookedStore>) {
        let mut hooked = None;
        let harness = Self::build(config, tools, |store| {
            let wrapper = Arc::new(HookedStore::new(store));
            hooked = Some(Arc::clone(&wrapper));
            wrapper as Arc<dyn Store>
        });
        (harness, hooked.expect("hooked store was built"))
    }

    fn build(
        config: ReconConfig,
        tools: &[&str],
        wrap: impl FnOnce(Arc<SqliteStore>) -> Arc<dyn Store>,
    ) -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().expect("in-memory sqlite"));
        let bus = Arc::new(EventBus::new(4096));
        let backend = Arc::new(ScriptedBackend::new());

        let fs = MockFileSystem::new();
        for tool in tools {
            fs.add_executable(PathBuf::from(TOOL_DIR).join(tool));
        }
        let locator = Arc::new(ToolLocator::new(Arc::new(fs.clone()), vec![PathBuf::from(TOOL_DIR)]));

        let orchestrator = Orchestrator::new(config, wrap(store.clone()), bus.clone(), backend.clone(), locator);

        Self {
            store,
            bus,
            backend,
            fs,
            orchestrator,
        }
    }

    pub fn add_target(&self, target: NewTarget) -> Target {
        self.store.insert_target(&target).expect("insert target")
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReconEvent> {
        self.bus.subscribe()
    }

    /// Start a job with the target's own profile and collect its events
    /// through the terminal one.
    pub async fn run_to_end(&self, target: &Target) -> (JobId, Vec<ReconEvent>) {
        let mut rx = self.subscribe();
        let job_id = self
            .orchestrator
            .start(target.id, target.profile)
            .expect("start job");
        let events = collect_until_terminal(&mut rx, &job_id).await;
        (job_id, events)
    }
}

/// Receive events for `job_id` until (and including) a terminal event.
pub async fn collect_until_terminal(rx: &mut broadcast::Receiver<ReconEvent>, job_id: &str) -> Vec<ReconEvent> {
    let mut events = Vec::new();
    loop {
        let event = rx.recv().await.expect("event bus closed or lagged");
        if event.job_id() != job_id {
            continue;
        }
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// `(stage, status, count)` for every stage update in `events`.
pub fn stage_updates(events: &[ReconEvent]) -> Vec<(Stage, StageStatus, Option<usize>)> {
    events
        .iter()
        .filter_map(|e| match e {
            ReconEvent::StageUpdate {
                stage, status, count, ..
            } => Some((*stage, *status, *count)),
            _ => None,
        })
        .collect()
}
