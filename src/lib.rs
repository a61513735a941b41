// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod stages;
pub mod store;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{ReconConfig, load_or_default};
use crate::engine::{Orchestrator, StagePolicy};
use crate::events::{EventBus, ReconEvent};
use crate::exec::{RealProcessBackend, ToolLocator};
use crate::store::{NewTarget, SqliteStore, Store, Target};
use crate::types::{Profile, TargetType};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the SQLite store and the event bus
/// - the orchestrator with the real process backend
/// - Ctrl-C handling (stops the running job)
pub async fn run(args: CliArgs) -> Result<()> {
    let config = load_or_default(Path::new(&args.config))
        .with_context(|| format!("loading config from '{}'", args.config))?;

    match args.command {
        Command::Plan {
            target_type,
            profile,
        } => {
            print_plan(&StagePolicy::new(config.custom_skip.clone()), target_type, profile);
            Ok(())
        }
        Command::Tools => {
            let locator = ToolLocator::from_env(&config.tools.extra_paths);
            print_tool_report(&locator);
            Ok(())
        }
        Command::Status { job_id } => {
            let store = SqliteStore::open(&args.db)
                .with_context(|| format!("opening database '{}'", args.db))?;
            match store.get_job(&job_id)? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    Ok(())
                }
                None => bail!("job not found: {job_id}"),
            }
        }
        Command::Run {
            target,
            target_type,
            profile,
            name,
            tags,
            notes,
        } => {
            let new_target = NewTarget {
                name,
                value: target.trim().to_string(),
                target_type,
                profile,
                tags,
                notes,
            };
            run_job(config, &args.db, new_target).await
        }
    }
}

async fn run_job(config: ReconConfig, db: &str, new_target: NewTarget) -> Result<()> {
    if new_target.value.is_empty() {
        bail!("target must not be empty");
    }
    let profile = new_target.profile;

    let store: Arc<dyn Store> =
        Arc::new(SqliteStore::open(db).with_context(|| format!("opening database '{db}'"))?);
    let target = find_or_create_target(store.as_ref(), &new_target)?;

    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();

    let locator = Arc::new(ToolLocator::from_env(&config.tools.extra_paths));
    let orchestrator = Orchestrator::new(config, store, bus, Arc::new(RealProcessBackend), locator);

    let job_id = orchestrator.start(target.id, profile)?;
    info!(job_id = %job_id, target = %target.value, "job running; press Ctrl-C to stop");

    let mut listen_for_ctrl_c = true;
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(event) if event.job_id() == job_id => {
                    println!("{}", serde_json::to_string(&event)?);
                    match event {
                        ReconEvent::JobError { error, .. } => bail!("job {job_id} failed: {error}"),
                        e if e.is_terminal() => break,
                        _ => {}
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged; some events were not printed");
                }
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c(), if listen_for_ctrl_c => {
                listen_for_ctrl_c = false;
                match signal {
                    Ok(()) => {
                        info!(job_id = %job_id, "Ctrl-C received; stopping job");
                        orchestrator.stop(&job_id)?;
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
                }
            }
        }
    }

    debug!(job_id = %job_id, "event stream finished");
    Ok(())
}

fn find_or_create_target(store: &dyn Store, new_target: &NewTarget) -> Result<Target> {
    if let Some(existing) = store.find_target_by_value(&new_target.value)? {
        if existing.target_type != new_target.target_type {
            warn!(
                target = %new_target.value,
                stored = %existing.target_type,
                requested = %new_target.target_type,
                "target already registered with a different type; using the stored type"
            );
        }
        return Ok(existing);
    }

    Ok(store.insert_target(new_target)?)
}

/// Print run/skip for every stage.
fn print_plan(policy: &StagePolicy, target_type: TargetType, profile: Profile) {
    println!("reconpipe plan");
    println!("  target type = {target_type}");
    println!("  profile = {profile}");
    println!();

    for (stage, decision) in policy.plan(target_type, profile) {
        match decision {
            engine::Applicability::Run => println!("  - {stage}: run"),
            engine::Applicability::Skip(reason) => println!("  - {stage}: skip ({reason})"),
        }
    }

    debug!("plan complete (no execution)");
}

fn print_tool_report(locator: &ToolLocator) {
    println!("tools:");
    for (tool, path) in locator.report() {
        match path {
            Some(path) => println!("  - {}: {}", tool.name(), path.display()),
            None => println!("  - {}: not found", tool.name()),
        }
    }
}
