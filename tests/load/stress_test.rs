//! Load Testing Suite for the reviewer service
//!
//! Drives the configured review scenario against a running backend and
//! enforces the configured thresholds:
//! - p(95) request duration below 300ms
//! - request failure rate below 0.1%

use std::sync::Arc;
use std::time::Duration;

use reviewer_loadtest::config::Config;
use reviewer_loadtest::http::HttpClient;
use reviewer_loadtest::metrics::Metrics;
use reviewer_loadtest::scenario::review::{CHECK_CREATE_PR, CHECK_GET_REVIEW, CHECK_TEAM_READY};
use reviewer_loadtest::{ReviewScenario, RunOptions, Runner};

fn runner(cfg: &Config, options: RunOptions) -> Runner {
    let http = HttpClient::new(&cfg.target, Arc::new(Metrics::new())).expect("http client");
    Runner::new(options, http, cfg.thresholds().expect("thresholds"))
}

/// Test: Configured run meets its thresholds
///
/// 20 virtual users for 30 seconds by default, as configured.
#[tokio::test]
#[ignore] // Needs a running reviewer service
async fn test_configured_run_meets_thresholds() {
    let cfg = Config::load().expect("config");
    let runner = runner(&cfg, RunOptions::from(&cfg.load));

    let report = runner
        .run(Arc::new(ReviewScenario::from_config(&cfg)))
        .await;
    println!("{report}");

    assert_eq!(report.setup_data.team_name, cfg.scenario.team_name);
    assert_eq!(report.summary.check(CHECK_TEAM_READY).unwrap().fails, 0);
    assert!(
        report.passed(),
        "thresholds breached: {:?}",
        report.breached().collect::<Vec<_>>()
    );
}

/// Test: Re-running setup against a seeded backend
///
/// The team already exists after the first run; the second must still pass
/// its setup check.
#[tokio::test]
#[ignore] // Needs a running reviewer service
async fn test_repeated_runs_are_idempotent() {
    let cfg = Config::load().expect("config");
    let options = RunOptions {
        vus: 2,
        duration: Duration::from_secs(2),
        graceful_stop: Duration::from_secs(10),
    };

    for _ in 0..2 {
        let report = runner(&cfg, options)
            .run(Arc::new(ReviewScenario::from_config(&cfg)))
            .await;
        assert_eq!(report.summary.check(CHECK_TEAM_READY).unwrap().fails, 0);
        assert_eq!(report.summary.check(CHECK_GET_REVIEW).unwrap().fails, 0);
    }
}

/// Test: Short burst with many virtual users
///
/// 100 virtual users without pauses for 10 seconds. Pull request ids restart
/// at `pr-{vu}-0` on every run, so creation may be rejected by a backend that
/// kept earlier runs; the review endpoint must keep answering either way.
#[tokio::test]
#[ignore] // Needs a running reviewer service
async fn test_burst_keeps_review_endpoint_available() {
    let cfg = Config::load().expect("config");
    let options = RunOptions {
        vus: 100,
        duration: Duration::from_secs(10),
        graceful_stop: Duration::from_secs(30),
    };

    let report = runner(&cfg, options)
        .run(Arc::new(ReviewScenario::new(
            cfg.scenario.team_name.clone(),
            Duration::ZERO,
        )))
        .await;
    println!("{report}");

    assert!(report.summary.iterations >= 100);
    assert!(report.summary.check(CHECK_CREATE_PR).is_some());
    assert_eq!(report.summary.check(CHECK_GET_REVIEW).unwrap().fails, 0);
}
