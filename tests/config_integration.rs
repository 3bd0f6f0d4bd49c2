//! Configuration files driving a full simulation

use std::fs;
use std::time::Duration;
use steadfast::error::{EXIT_FATAL, EXIT_PARTIAL};
use steadfast::{
    run_simulation, HandlerKind, SteadfastConfig, SteadfastError, Workload,
};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

#[test]
fn test_config_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("steadfast.toml");
    fs::write(
        &path,
        r#"
[limiter]
capacity = 20
rate_per_second = 50
handler = { kind = "wait_and_retry" }

[retry]
max_attempts = 2

[logging]
level = "warn"
"#,
    )
    .unwrap();

    let config = SteadfastConfig::from_file(&path).unwrap();
    assert_eq!(config.limiter.capacity, 20);
    assert_eq!(
        config.limiter.handler,
        HandlerKind::WaitAndRetry { max_waits: None }
    );
    assert_eq!(config.retry.delay(), Duration::from_millis(100));
    tokio_test::assert_ok!(config.validate());

    let limiter = config.limiter.build::<(), ()>().unwrap();
    assert_eq!(limiter.tick_interval(), Duration::from_millis(20));
}

#[test]
fn test_invalid_rate_in_file_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[limiter]\ncapacity = 1000\nrate_per_second = 9\n").unwrap();

    let err = SteadfastConfig::from_file(&path)
        .and_then(|c| c.validate())
        .unwrap_err();
    assert!(matches!(err, SteadfastError::Limiter(_)));
    assert_eq!(err.exit_code(), EXIT_FATAL);
}

#[test]
fn test_malformed_toml_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[limiter\ncapacity = ").unwrap();

    let err = SteadfastConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, SteadfastError::ConfigParse(_)));
    assert_eq!(err.exit_code(), EXIT_FATAL);
}

#[tokio::test(start_paused = true)]
async fn test_simulation_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sim.toml");
    fs::write(
        &path,
        "[limiter]\ncapacity = 4\nrate_per_second = 100\n\n[retry]\nmax_attempts = 50\ndelay_ms = 5\n",
    )
    .unwrap();
    let config = SteadfastConfig::from_file(&path).unwrap();

    let report = run_simulation(
        &config,
        &Workload {
            tasks: 8,
            fail_every: Some(4),
        },
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.total(), 8);
    assert!(report.is_complete(), "report: {}", report);
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_without_retries_is_partial() {
    let mut config = SteadfastConfig::default();
    config.retry.max_attempts = 1;

    let report = run_simulation(
        &config,
        &Workload {
            tasks: 5,
            fail_every: None,
        },
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.rejected, 4);

    let incomplete = SteadfastError::Incomplete {
        failed: report.total() - report.succeeded,
        total: report.total(),
    };
    assert_eq!(incomplete.exit_code(), EXIT_PARTIAL);
}
