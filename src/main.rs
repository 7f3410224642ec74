use anyhow::Result;
use reviewer_loadtest::{
    config::Config, http::HttpClient, metrics::Metrics, telemetry, ReviewScenario, RunOptions,
    Runner,
};
use std::process::ExitCode;
use std::sync::Arc;
use telemetry::init_tracing;
use tracing::{error, info};

/// Exit status when the run completed but a threshold was breached.
const THRESHOLDS_BREACHED: u8 = 99;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let thresholds = cfg.thresholds()?;

    info!(
        base_url = %cfg.target.base_url,
        vus = cfg.load.vus,
        duration_s = cfg.load.duration_seconds,
        "starting load test"
    );

    let http = HttpClient::new(&cfg.target, Arc::new(Metrics::new()))?;
    let runner = Runner::new(RunOptions::from(&cfg.load), http, thresholds);

    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        telemetry::shutdown_signal().await;
        cancel.cancel();
    });

    let report = runner.run(Arc::new(ReviewScenario::from_config(&cfg))).await;
    println!("{report}");

    if report.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        for t in report.breached() {
            error!(metric = %t.metric, threshold = %t.expression, observed = t.observed, "threshold breached");
        }
        Ok(ExitCode::from(THRESHOLDS_BREACHED))
    }
}
