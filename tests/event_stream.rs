// tests/event_stream.rs

use std::error::Error;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use clap::Parser;
use reconpipe::cli::{CliArgs, Command, LogLevel};
use reconpipe::events::{ActivitySink, EventBus, EventSink, JobLogger, ReconEvent};
use reconpipe::logging::build_filter;
use reconpipe::store::{SqliteStore, Store};
use reconpipe::types::{ActivityLevel, Profile, Stage, StageStatus, TargetType};
use reconpipe_test_utils::{init_tracing, with_timeout};
use serde_json::json;
use tracing_subscriber::EnvFilter;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn stage_update_wire_shape() -> TestResult {
    let event = ReconEvent::StageUpdate {
        job_id: "job-1".to_string(),
        stage: Stage::LiveHosts,
        status: StageStatus::Done,
        count: Some(3),
    };
    assert_eq!(
        serde_json::to_value(&event)?,
        json!({"type": "stage_update", "jobId": "job-1", "stage": "Live hosts", "status": "done", "count": 3})
    );

    let running = ReconEvent::StageUpdate {
        job_id: "job-1".to_string(),
        stage: Stage::DnsRecords,
        status: StageStatus::Running,
        count: None,
    };
    assert_eq!(
        serde_json::to_value(&running)?,
        json!({"type": "stage_update", "jobId": "job-1", "stage": "DNS records", "status": "running"})
    );
    Ok(())
}

#[test]
fn lifecycle_and_activity_wire_shape() -> TestResult {
    let error = ReconEvent::JobError {
        job_id: "job-1".to_string(),
        error: "boom".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&error)?,
        json!({"type": "job_error", "jobId": "job-1", "error": "boom"})
    );
    assert_eq!(
        serde_json::to_value(ReconEvent::JobComplete { job_id: "job-1".to_string() })?,
        json!({"type": "job_complete", "jobId": "job-1"})
    );

    let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let activity = ReconEvent::Activity {
        job_id: "job-1".to_string(),
        message: "CMD: dig +short example.com".to_string(),
        level: ActivityLevel::Warning,
        timestamp: at,
    };
    let value = serde_json::to_value(&activity)?;
    assert_eq!(value["type"], "activity");
    assert_eq!(value["level"], "warning");
    assert_eq!(value["timestamp"], "2026-01-02T03:04:05Z");

    let parsed: ReconEvent = serde_json::from_value(value)?;
    assert_eq!(parsed, activity);
    Ok(())
}

#[test]
fn terminal_events() {
    let id = || "job-1".to_string();
    assert!(ReconEvent::JobComplete { job_id: id() }.is_terminal());
    assert!(ReconEvent::JobStopped { job_id: id() }.is_terminal());
    assert!(ReconEvent::JobError { job_id: id(), error: String::new() }.is_terminal());
    assert!(!ReconEvent::JobPaused { job_id: id() }.is_terminal());
    assert!(!ReconEvent::JobResumed { job_id: id() }.is_terminal());
}

#[tokio::test]
async fn activity_is_persisted_then_broadcast_to_every_subscriber() -> TestResult {
    init_tracing();
    let store = Arc::new(SqliteStore::open_in_memory()?);
    let bus = Arc::new(EventBus::new(16));
    let mut first = bus.subscribe();
    let mut second = bus.subscribe();

    let log = JobLogger::new("job-9", Arc::new(ActivitySink::new(store.clone(), bus.clone())));
    log.success("Reconnaissance job completed successfully");

    for rx in [&mut first, &mut second] {
        match with_timeout(rx.recv()).await? {
            ReconEvent::Activity { job_id, message, level, .. } => {
                assert_eq!(job_id, "job-9");
                assert_eq!(level, ActivityLevel::Success);
                assert_eq!(message, "Reconnaissance job completed successfully");
            }
            other => panic!("Expected activity, got: {other:?}"),
        }
    }
    assert_eq!(store.list_activity("job-9")?.len(), 1);
    Ok(())
}

#[test]
fn publishing_without_subscribers_is_fine() {
    let bus = EventBus::new(4);
    bus.publish(ReconEvent::JobPaused { job_id: "job-1".to_string() });
    let mut late = bus.subscribe();
    assert!(late.try_recv().is_err());
}

#[test]
fn cli_run_defaults() {
    let args = CliArgs::try_parse_from(["reconpipe", "run", "example.com"]).unwrap();
    assert_eq!(args.config, "Recon.toml");
    assert_eq!(args.db, "recon.db");
    match args.command {
        Command::Run { target, target_type, profile, name, tags, notes } => {
            assert_eq!(target, "example.com");
            assert_eq!(target_type, TargetType::Domain);
            assert_eq!(profile, Profile::StandardExternal);
            assert_eq!(name, None);
            assert!(tags.is_empty());
            assert_eq!(notes, None);
        }
        other => panic!("Expected run, got: {other:?}"),
    }
}

#[test]
fn cli_run_with_type_profile_and_global_flags() {
    let args = CliArgs::try_parse_from([
        "reconpipe", "run", "10.0.0.5", "--type", "ip", "--profile", "osint-heavy", "--db", "/tmp/x.db",
    ])
    .unwrap();
    assert_eq!(args.db, "/tmp/x.db");
    assert!(matches!(
        args.command,
        Command::Run { target_type: TargetType::Ip, profile: Profile::OsintHeavy, .. }
    ));
}

#[test]
fn cli_run_collects_repeated_tags() {
    let args = CliArgs::try_parse_from([
        "reconpipe", "run", "example.com", "--name", "Example Corp", "--tag", "external", "--tag", "q3",
    ])
    .unwrap();
    match args.command {
        Command::Run { name, tags, .. } => {
            assert_eq!(name.as_deref(), Some("Example Corp"));
            assert_eq!(tags, vec!["external", "q3"]);
        }
        other => panic!("Expected run, got: {other:?}"),
    }
}

#[test]
fn cli_rejects_unknown_profile() {
    assert!(CliArgs::try_parse_from(["reconpipe", "run", "example.com", "--profile", "loud"]).is_err());
}

#[test]
fn cli_plan_takes_type_and_optional_profile() {
    let args = CliArgs::try_parse_from(["reconpipe", "plan", "cidr"]).unwrap();
    assert!(matches!(
        args.command,
        Command::Plan { target_type: TargetType::Cidr, profile: Profile::StandardExternal }
    ));
}

#[test]
fn log_filter_prefers_the_cli_flag() {
    let filter = build_filter(Some(LogLevel::Debug), Some("reconpipe=trace"));
    assert_eq!(filter.to_string(), "debug");
}

#[test]
fn log_filter_reads_env_directives_and_falls_back_to_info() {
    assert_eq!(
        build_filter(None, Some("reconpipe::engine=debug,warn")).to_string(),
        EnvFilter::new("reconpipe::engine=debug,warn").to_string()
    );
    assert_eq!(build_filter(None, None).to_string(), "info");
    assert_eq!(build_filter(None, Some("  ")).to_string(), "info");
    assert_eq!(build_filter(None, Some("reconpipe=loud")).to_string(), "info");
}
