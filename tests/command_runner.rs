// tests/command_runner.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use reconpipe::errors::ReconError;
use reconpipe::events::{ActivitySink, EventBus, JobLogger};
use reconpipe::exec::{CommandRunner, CommandSpec, RunMode, format_output};
use reconpipe::store::{SqliteStore, Store};
use reconpipe::types::ActivityLevel;
use reconpipe_test_utils::{Reply, ScriptedBackend, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

struct Fixture {
    store: Arc<SqliteStore>,
    backend: Arc<ScriptedBackend>,
    runner: CommandRunner,
    log: JobLogger,
}

fn fixture(log_chars: usize) -> Fixture {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let bus = Arc::new(EventBus::default());
    let backend = Arc::new(ScriptedBackend::new());
    let sink = Arc::new(ActivitySink::new(store.clone(), bus));
    Fixture {
        runner: CommandRunner::new(backend.clone(), 4096, log_chars),
        log: JobLogger::new("job-runner", sink),
        store,
        backend,
    }
}

fn dig_spec(args: &[&str]) -> CommandSpec {
    CommandSpec::new("/usr/bin/dig", args.iter().copied(), Duration::from_secs(5))
}

impl Fixture {
    fn activity(&self) -> Vec<(ActivityLevel, String)> {
        self.store
            .list_activity("job-runner")
            .unwrap()
            .into_iter()
            .map(|e| (e.level, e.message))
            .collect()
    }
}

#[tokio::test]
async fn success_logs_command_and_stdout() -> TestResult {
    init_tracing();
    let fx = fixture(4000);
    fx.backend.on("dig", None, Reply::stdout("93.184.216.34\n"));

    let out = with_timeout(fx.runner.run(&dig_spec(&["+short", "example.com"]), RunMode::Strict, &fx.log)).await?;

    assert!(out.success());
    assert_eq!(out.lines().collect::<Vec<_>>(), vec!["93.184.216.34"]);

    let activity = fx.activity();
    assert_eq!(
        activity,
        vec![
            (ActivityLevel::Info, "CMD: dig +short example.com".to_string()),
            (ActivityLevel::Info, "STDOUT:\n93.184.216.34".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn strict_mode_returns_command_failed_with_stderr() -> TestResult {
    init_tracing();
    let fx = fixture(4000);
    fx.backend.on("dig", None, Reply::fail(9, "connection refused\n"));

    let err = with_timeout(fx.runner.run(&dig_spec(&["example.com"]), RunMode::Strict, &fx.log))
        .await
        .unwrap_err();

    match &err {
        ReconError::CommandFailed { code, stderr, .. } => {
            assert_eq!(*code, Some(9));
            assert!(stderr.contains("connection refused"));
        }
        other => panic!("Expected CommandFailed, got: {other:?}"),
    }
    assert!(err.to_string().contains("(connection refused)"));

    let activity = fx.activity();
    assert!(activity.contains(&(ActivityLevel::Warning, "STDERR:\nconnection refused".to_string())));
    let last = activity.last().unwrap();
    assert_eq!(last.0, ActivityLevel::Error);
    assert!(last.1.starts_with("CMD failed: "));
    Ok(())
}

#[tokio::test]
async fn allow_failure_returns_captured_output() -> TestResult {
    init_tracing();
    let fx = fixture(4000);
    fx.backend.on(
        "dig",
        None,
        Reply::Exit {
            code: 1,
            stdout: "partial answer\n".to_string(),
            stderr: "warning\n".to_string(),
        },
    );

    let out = with_timeout(fx.runner.run(&dig_spec(&["example.com", "ANY"]), RunMode::AllowFailure, &fx.log)).await?;

    assert_eq!(out.exit_code, Some(1));
    assert!(!out.success());
    assert_eq!(out.stdout, "partial answer\n");
    assert_eq!(fx.activity().last().unwrap().0, ActivityLevel::Warning);
    Ok(())
}

#[tokio::test]
async fn timeout_is_reported_with_command_and_duration() -> TestResult {
    init_tracing();
    let fx = fixture(4000);
    fx.backend.on("dig", None, Reply::Timeout);

    let err = with_timeout(fx.runner.run(&dig_spec(&["+short", "slow.example.com"]), RunMode::Strict, &fx.log))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconError::CommandTimeout { .. }));
    assert_eq!(err.to_string(), "Command timed out after 5s: dig +short slow.example.com");

    let lenient = with_timeout(fx.runner.run(&dig_spec(&["+short", "slow.example.com"]), RunMode::AllowFailure, &fx.log)).await?;
    assert!(lenient.timed_out);
    assert_eq!(lenient.exit_code, None);
    Ok(())
}

#[tokio::test]
async fn output_flood_is_an_output_limit_error() -> TestResult {
    init_tracing();
    let fx = fixture(4000);
    fx.backend.on("dig", None, Reply::Flood { stdout: "x".repeat(10_000) });

    let err = with_timeout(fx.runner.run(&dig_spec(&["example.com"]), RunMode::Strict, &fx.log))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconError::OutputLimitExceeded { limit: 4096, .. }));

    let lenient = with_timeout(fx.runner.run(&dig_spec(&["example.com"]), RunMode::AllowFailure, &fx.log)).await?;
    assert!(lenient.truncated);
    assert_eq!(lenient.stdout.len(), 4096);
    Ok(())
}

#[tokio::test]
async fn spawn_error_in_allow_failure_mode_yields_empty_output() -> TestResult {
    init_tracing();
    let fx = fixture(4000);
    fx.backend.on("dig", None, Reply::SpawnError);

    let out = with_timeout(fx.runner.run(&dig_spec(&["example.com"]), RunMode::AllowFailure, &fx.log)).await?;
    assert!(out.stdout.is_empty());
    assert!(out.stderr.contains("Tool not found"));

    let strict = with_timeout(fx.runner.run(&dig_spec(&["example.com"]), RunMode::Strict, &fx.log)).await;
    assert!(matches!(strict, Err(ReconError::ToolNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn long_output_is_truncated_in_the_activity_log() -> TestResult {
    init_tracing();
    let fx = fixture(10);
    fx.backend.on("dig", None, Reply::stdout("0123456789abcdef"));

    let out = with_timeout(fx.runner.run(&dig_spec(&["example.com"]), RunMode::Strict, &fx.log)).await?;

    // The caller still gets everything.
    assert_eq!(out.stdout, "0123456789abcdef");
    assert!(fx
        .activity()
        .contains(&(ActivityLevel::Info, "STDOUT (truncated):\n0123456789\n...".to_string())));
    Ok(())
}

#[test]
fn format_output_counts_characters_not_bytes() {
    assert_eq!(format_output("STDOUT", "ééé\n", 3), "STDOUT:\nééé");
    assert_eq!(format_output("STDERR", "éééé", 2), "STDERR (truncated):\néé\n...");
}

#[test]
fn display_quotes_arguments_with_spaces() {
    let spec = CommandSpec::new("/usr/bin/curl", ["-w", "%{http_code} done", ""], Duration::from_secs(1));
    assert_eq!(spec.display(), "curl -w '%{http_code} done' ''");
    assert_eq!(spec.program_name(), "curl");
}
