// tests/job_state.rs

use chrono::Utc;
use reconpipe::engine::{Boundary, JobState, ResumeAction};
use reconpipe::store::Target;
use reconpipe::types::{JobStatus, Profile, Stage, StageStatus, TargetStatus, TargetType};

fn state() -> JobState {
    let target = Target {
        id: 7,
        name: "Example".to_string(),
        value: "example.com".to_string(),
        target_type: TargetType::Domain,
        profile: Profile::StandardExternal,
        status: TargetStatus::Running,
        tags: Vec::new(),
        notes: None,
        created_at: Utc::now(),
        last_run: None,
    };
    JobState::new("job-1", &target, Profile::Stealth, Utc::now())
}

#[test]
fn new_job_has_every_stage_queued() {
    let s = state();
    let snap = s.snapshot();

    assert_eq!(snap.job_id, "job-1");
    assert_eq!(snap.target_id, 7);
    assert_eq!(snap.profile, Profile::Stealth);
    assert_eq!(snap.status, JobStatus::Running);
    assert!(!snap.paused);
    assert!(snap.current_stage.is_none());
    assert_eq!(snap.stages.len(), Stage::ALL.len());
    assert!(snap.stages.values().all(|p| p.status == StageStatus::Queued && p.count.is_none()));
    assert!(s.worker_active());
}

#[test]
fn stage_progress_and_completion() {
    let mut s = state();

    assert_eq!(s.enter_boundary(), Boundary::Proceed);
    assert!(s.mark_running(Stage::Subdomains));
    assert_eq!(s.snapshot().current_stage, Some(Stage::Subdomains));
    assert!(s.mark_done(Stage::Subdomains, 4));
    assert!(s.mark_skipped(Stage::DnsRecords));

    let snap = s.snapshot();
    assert_eq!(snap.stages[&Stage::Subdomains].count, Some(4));
    assert_eq!(snap.stages[&Stage::DnsRecords].status, StageStatus::Skipped);
    assert_eq!(snap.stages[&Stage::DnsRecords].count, Some(0));
    assert!(s.stage_status(Stage::Subdomains).is_finished());
    assert!(!s.stage_status(Stage::LiveHosts).is_finished());

    assert!(s.complete());
    assert_eq!(s.status(), JobStatus::Completed);
    assert!(!s.worker_active());
    assert!(!s.complete());
    assert!(!s.stop());
}

#[test]
fn pause_lets_the_running_stage_finish_then_halts() {
    let mut s = state();
    assert!(s.mark_running(Stage::Subdomains));

    assert!(s.pause());
    assert!(!s.pause());
    assert!(s.is_paused());

    // In-flight stage may still finish.
    assert!(s.mark_done(Stage::Subdomains, 2));
    // But nothing new starts.
    assert!(!s.mark_running(Stage::DnsRecords));
    assert!(!s.mark_skipped(Stage::DnsRecords));
    assert_eq!(s.enter_boundary(), Boundary::Halt);
    assert!(!s.worker_active());

    assert_eq!(s.resume(), ResumeAction::SpawnWorker);
    assert!(s.worker_active());
    assert_eq!(s.resume(), ResumeAction::NotPaused);
    assert_eq!(s.enter_boundary(), Boundary::Proceed);
}

#[test]
fn resume_before_boundary_continues_the_same_worker() {
    let mut s = state();
    assert!(s.pause());
    assert_eq!(s.resume(), ResumeAction::Continue);
    assert_eq!(s.enter_boundary(), Boundary::Proceed);
}

#[test]
fn pause_after_boundary_check_releases_the_worker() {
    let mut s = state();
    assert_eq!(s.enter_boundary(), Boundary::Proceed);
    assert!(s.pause());

    // The worker learns of the pause only when the stage refuses to start.
    assert!(!s.mark_running(Stage::Subdomains));
    assert!(!s.worker_active());
    assert_eq!(s.resume(), ResumeAction::SpawnWorker);
    assert_eq!(s.enter_boundary(), Boundary::Proceed);
    assert!(s.mark_running(Stage::Subdomains));
}

#[test]
fn pause_before_a_skip_releases_the_worker() {
    let mut s = state();
    assert_eq!(s.enter_boundary(), Boundary::Proceed);
    assert!(s.pause());

    assert!(!s.mark_skipped(Stage::Subdomains));
    assert_eq!(s.stage_status(Stage::Subdomains), StageStatus::Queued);
    assert_eq!(s.resume(), ResumeAction::SpawnWorker);
}

#[test]
fn stop_blocks_all_further_progress() {
    let mut s = state();
    assert!(s.mark_running(Stage::Subdomains));
    assert!(s.stop());

    assert!(!s.mark_done(Stage::Subdomains, 3));
    assert_eq!(s.stage_status(Stage::Subdomains), StageStatus::Running);
    assert!(!s.pause());
    assert_eq!(s.resume(), ResumeAction::NotPaused);
    assert!(!s.complete());
    assert!(!s.fail());
    assert_eq!(s.enter_boundary(), Boundary::Halt);
    assert_eq!(s.status(), JobStatus::Stopped);
}

#[test]
fn paused_job_can_be_stopped_but_not_resumed() {
    let mut s = state();
    assert!(s.pause());
    assert!(s.stop());
    assert_eq!(s.resume(), ResumeAction::NotPaused);
}

#[test]
fn failure_is_terminal() {
    let mut s = state();
    assert!(s.fail());
    assert_eq!(s.status(), JobStatus::Failed);
    assert!(!s.worker_active());
    assert!(!s.stop());
}

#[test]
fn snapshot_serializes_camel_case() {
    let value = serde_json::to_value(state().snapshot()).unwrap();
    assert_eq!(value["jobId"], "job-1");
    assert_eq!(value["targetType"], "domain");
    assert_eq!(value["stages"]["Subdomains"]["status"], "queued");
    assert!(value["currentStage"].is_null());
}
