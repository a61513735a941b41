// tests/job_control.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use reconpipe::engine::JobView;
use reconpipe::events::ReconEvent;
use reconpipe::store::Store;
use reconpipe::types::{JobStatus, Profile, Stage, StageStatus, TargetStatus};
use reconpipe_test_utils::{
    ConfigBuilder, Gate, Harness, Reply, TargetBuilder, collect_until_terminal, init_tracing,
    stage_updates, with_timeout,
};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

type TestResult = Result<(), Box<dyn Error>>;

fn harness() -> Harness {
    let h = Harness::new(ConfigBuilder::new().build(), &["subfinder", "dig", "httpx"]);
    h.backend
        .on("dig", Some("a.example.com"), Reply::stdout("93.184.216.34\n"))
        .on("dig", Some("b.example.com"), Reply::stdout("93.184.216.35\n"))
        .on("dig", Some("ANY"), Reply::stdout("example.com. 300 IN A 93.184.216.34\n"))
        .on("httpx", Some("a.example.com"), Reply::stdout("https://a.example.com [200]\n"));
    h
}

fn gated_subfinder(h: &Harness) -> Gate {
    let gate = Gate::new();
    h.backend.on_gated(
        "subfinder",
        None,
        Reply::stdout("a.example.com\nb.example.com\n"),
        &gate,
    );
    gate
}

/// Receive events for `job_id` until `pred` matches, returning everything seen.
async fn recv_until(
    rx: &mut broadcast::Receiver<ReconEvent>,
    job_id: &str,
    pred: impl Fn(&ReconEvent) -> bool,
) -> Vec<ReconEvent> {
    let mut seen = Vec::new();
    loop {
        let event = rx.recv().await.expect("event bus closed or lagged");
        if event.job_id() != job_id {
            continue;
        }
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Drain whatever is already queued for `job_id`.
fn drain(rx: &mut broadcast::Receiver<ReconEvent>, job_id: &str) -> Vec<ReconEvent> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) if event.job_id() == job_id => out.push(event),
            Ok(_) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => return out,
            Err(TryRecvError::Lagged(n)) => panic!("lagged by {n} events"),
        }
    }
}

fn is_stage(event: &ReconEvent, stage: Stage, status: StageStatus) -> bool {
    matches!(event, ReconEvent::StageUpdate { stage: s, status: st, .. } if *s == stage && *st == status)
}

#[tokio::test]
async fn pause_holds_at_boundary_and_resume_finishes_the_same_way() -> TestResult {
    init_tracing();
    let h = harness();
    let gate = gated_subfinder(&h);
    let target = h.add_target(TargetBuilder::domain("example.com").build());
    let mut rx = h.subscribe();

    let job_id = h.orchestrator.start(target.id, Profile::StandardExternal)?;
    with_timeout(gate.entered()).await;

    assert!(h.orchestrator.pause(&job_id)?);
    // A second pause is a no-op.
    assert!(!h.orchestrator.pause(&job_id)?);
    assert_eq!(h.store.get_job(&job_id)?.unwrap().status, JobStatus::Paused);

    gate.release();
    let mut events = with_timeout(recv_until(&mut rx, &job_id, |e| {
        is_stage(e, Stage::Subdomains, StageStatus::Done)
    }))
    .await;
    assert!(events.iter().any(|e| matches!(e, ReconEvent::JobPaused { .. })));

    // The worker stops at the next boundary.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let idle = drain(&mut rx, &job_id);
    assert!(stage_updates(&idle).is_empty(), "stage ran while paused: {idle:?}");

    match h.orchestrator.status(&job_id)? {
        Some(JobView::Live(snapshot)) => {
            assert!(snapshot.paused);
            assert_eq!(snapshot.status, JobStatus::Running);
            assert_eq!(snapshot.stages[&Stage::Subdomains].status, StageStatus::Done);
            assert_eq!(snapshot.stages[&Stage::DnsRecords].status, StageStatus::Queued);
        }
        other => panic!("Expected live job, got: {other:?}"),
    }

    assert!(h.orchestrator.resume(&job_id)?);
    assert!(!h.orchestrator.resume(&job_id)?);
    events.extend(idle);
    events.extend(with_timeout(collect_until_terminal(&mut rx, &job_id)).await);

    assert!(matches!(events.last(), Some(ReconEvent::JobComplete { .. })));
    let updates = stage_updates(&events);
    let done: Vec<(Stage, Option<usize>)> = updates
        .iter()
        .filter(|(_, st, _)| *st == StageStatus::Done)
        .map(|(s, _, c)| (*s, *c))
        .collect();
    assert_eq!(
        done,
        vec![
            (Stage::Subdomains, Some(2)),
            (Stage::DnsRecords, Some(1)),
            (Stage::LiveHosts, Some(1)),
            (Stage::HttpProbing, Some(1)),
            (Stage::Directories, Some(0)),
            (Stage::VulnHints, Some(1)),
        ]
    );

    // Finished stages are not redone.
    assert_eq!(h.backend.calls_to("subfinder").len(), 1);
    assert_eq!(h.store.get_job(&job_id)?.unwrap().status, JobStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn resume_before_boundary_keeps_the_original_worker() -> TestResult {
    init_tracing();
    let h = harness();
    let gate = gated_subfinder(&h);
    let target = h.add_target(TargetBuilder::domain("example.com").build());
    let mut rx = h.subscribe();

    let job_id = h.orchestrator.start(target.id, Profile::StandardExternal)?;
    with_timeout(gate.entered()).await;

    assert!(h.orchestrator.pause(&job_id)?);
    assert!(h.orchestrator.resume(&job_id)?);
    gate.release();

    let events = with_timeout(collect_until_terminal(&mut rx, &job_id)).await;

    assert!(matches!(events.last(), Some(ReconEvent::JobComplete { .. })));
    let running_subdomains = stage_updates(&events)
        .into_iter()
        .filter(|(s, st, _)| *s == Stage::Subdomains && *st == StageStatus::Running)
        .count();
    assert_eq!(running_subdomains, 1);
    assert_eq!(h.backend.calls_to("subfinder").len(), 1);
    Ok(())
}

#[tokio::test]
async fn stop_is_terminal() -> TestResult {
    init_tracing();
    let h = harness();
    let gate = gated_subfinder(&h);
    let target = h.add_target(TargetBuilder::domain("example.com").build());
    let mut rx = h.subscribe();

    let job_id = h.orchestrator.start(target.id, Profile::StandardExternal)?;
    with_timeout(gate.entered()).await;

    assert!(h.orchestrator.stop(&job_id)?);
    let events = with_timeout(collect_until_terminal(&mut rx, &job_id)).await;
    assert!(matches!(events.last(), Some(ReconEvent::JobStopped { .. })));
    assert!(!h.orchestrator.registry().is_live(&job_id));

    // Let the in-flight stage finish; it must not announce anything.
    gate.release();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let after = drain(&mut rx, &job_id);
    assert!(stage_updates(&after).is_empty(), "stage update after stop: {after:?}");
    assert!(!after.iter().any(|e| e.is_terminal()));

    assert_eq!(h.store.get_job(&job_id)?.unwrap().status, JobStatus::Stopped);
    assert_eq!(h.store.get_target(target.id)?.unwrap().status, TargetStatus::Pending);
    assert!(h
        .store
        .list_activity(&job_id)?
        .iter()
        .any(|e| e.message == "Reconnaissance stopped by user"));

    assert!(!h.orchestrator.stop(&job_id)?);
    assert!(!h.orchestrator.pause(&job_id)?);
    assert!(!h.orchestrator.resume(&job_id)?);
    assert!(h.backend.calls_to("httpx").is_empty());
    Ok(())
}

#[tokio::test]
async fn stop_while_paused_prevents_resume() -> TestResult {
    init_tracing();
    let h = harness();
    let gate = gated_subfinder(&h);
    let target = h.add_target(TargetBuilder::domain("example.com").build());
    let mut rx = h.subscribe();

    let job_id = h.orchestrator.start(target.id, Profile::StandardExternal)?;
    with_timeout(gate.entered()).await;
    assert!(h.orchestrator.pause(&job_id)?);
    gate.release();
    with_timeout(recv_until(&mut rx, &job_id, |e| {
        is_stage(e, Stage::Subdomains, StageStatus::Done)
    }))
    .await;

    assert!(h.orchestrator.stop(&job_id)?);
    assert!(!h.orchestrator.resume(&job_id)?);

    let events = with_timeout(collect_until_terminal(&mut rx, &job_id)).await;
    assert!(matches!(events.last(), Some(ReconEvent::JobStopped { .. })));
    assert!(stage_updates(&events).is_empty());
    Ok(())
}

#[tokio::test]
async fn pause_landing_inside_a_skipped_stage_can_still_be_resumed() -> TestResult {
    init_tracing();
    let (h, hooked) = Harness::hooked(ConfigBuilder::new().build(), &["httpx"]);
    h.backend.on("httpx", None, Reply::stdout("https://192.0.2.10 [200]\n"));

    // The IP seed row is written after the boundary check and before the
    // skip is recorded; pause the job right there, once.
    let registry = Arc::clone(h.orchestrator.registry());
    let mut paused_once = false;
    hooked.set_hook(move |op| {
        if op == "upsert_subdomain" && !paused_once {
            paused_once = true;
            for id in registry.live_ids() {
                if let Some(job) = registry.live(&id) {
                    job.with(|s| s.pause());
                }
            }
        }
        Ok(())
    });

    let target = h.add_target(TargetBuilder::ip("192.0.2.10").build());
    let mut rx = h.subscribe();
    let job_id = h.orchestrator.start(target.id, Profile::StandardExternal)?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    let job = h.orchestrator.registry().live(&job_id).expect("job still live");
    assert!(job.with(|s| s.is_paused() && !s.worker_active()));
    assert!(stage_updates(&drain(&mut rx, &job_id)).is_empty());

    assert!(h.orchestrator.resume(&job_id)?);
    let events = with_timeout(collect_until_terminal(&mut rx, &job_id)).await;

    assert!(matches!(events.last(), Some(ReconEvent::JobComplete { .. })));
    let updates = stage_updates(&events);
    assert_eq!(updates[0], (Stage::Subdomains, StageStatus::Skipped, Some(0)));
    assert!(updates.contains(&(Stage::LiveHosts, StageStatus::Done, Some(1))));
    assert_eq!(h.store.get_job(&job_id)?.unwrap().status, JobStatus::Completed);
    assert_eq!(h.store.list_subdomains(target.id)?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_jobs_do_not_interfere() -> TestResult {
    init_tracing();
    let h = harness();
    h.backend.on("subfinder", None, Reply::stdout("a.example.com\nb.example.com\n"));
    let first = h.add_target(TargetBuilder::domain("example.com").build());
    let second = h.add_target(TargetBuilder::domain("example.org").build());
    let mut rx_first = h.subscribe();
    let mut rx_second = h.subscribe();

    let a = h.orchestrator.start(first.id, Profile::StandardExternal)?;
    let b = h.orchestrator.start(second.id, Profile::Stealth)?;
    assert_eq!(h.orchestrator.registry().live_ids().len(), 2);

    let events_a = with_timeout(collect_until_terminal(&mut rx_first, &a)).await;
    let events_b = with_timeout(collect_until_terminal(&mut rx_second, &b)).await;

    assert!(events_a.iter().all(|e| e.job_id() == a));
    assert!(events_b.iter().all(|e| e.job_id() == b));
    assert!(matches!(events_a.last(), Some(ReconEvent::JobComplete { .. })));
    assert!(matches!(events_b.last(), Some(ReconEvent::JobComplete { .. })));

    assert_eq!(h.store.list_subdomains(first.id)?.len(), 2);
    // subfinder output for example.org contains no in-scope names.
    let org_subs = h.store.list_subdomains(second.id)?;
    assert_eq!(org_subs.len(), 1);
    assert_eq!(org_subs[0].hostname, "example.org");
    Ok(())
}
