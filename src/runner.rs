//! Virtual-user scheduling.
//!
//! A run is: setup once on VU 0, then `vus` concurrent virtual users looping the
//! scenario iteration until the duration elapses or the run is cancelled. Hitting
//! the deadline stops new iterations; in-flight ones get `graceful_stop` to finish
//! before they are aborted and counted as interrupted.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::LoadConfig;
use crate::http::HttpClient;
use crate::metrics::{Metrics, Summary};
use crate::scenario::Scenario;
use crate::thresholds::{evaluate, MetricThresholds, ThresholdResult};

/// Per-VU execution context handed to scenario hooks
pub struct VirtualUser {
    id: u32,
    iteration: u64,
    sequence: u64,
    http: HttpClient,
    cancel: CancellationToken,
}

impl VirtualUser {
    pub fn new(id: u32, http: HttpClient, cancel: CancellationToken) -> Self {
        Self {
            id,
            iteration: 0,
            sequence: 0,
            http,
            cancel,
        }
    }

    /// 1-based for load VUs, 0 for the setup actor.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Completed iterations of this VU.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Next value of this VU's counter, starting at 0. Never repeats within a VU.
    pub fn next_sequence(&mut self) -> u64 {
        let n = self.sequence;
        self.sequence += 1;
        n
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        self.http.metrics()
    }

    /// Record a named check and return its outcome.
    pub fn check(&self, name: &str, passed: bool) -> bool {
        self.metrics().record_check(name, passed);
        passed
    }

    /// Pause the VU; returns early if the run is cancelled.
    pub async fn sleep(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub vus: u32,
    pub duration: Duration,
    pub graceful_stop: Duration,
}

impl From<&LoadConfig> for RunOptions {
    fn from(cfg: &LoadConfig) -> Self {
        Self {
            vus: cfg.vus,
            duration: cfg.duration(),
            graceful_stop: cfg.graceful_stop(),
        }
    }
}

/// Result of a finished run
#[derive(Debug)]
pub struct RunReport<D> {
    pub setup_data: Arc<D>,
    pub summary: Summary,
    pub thresholds: Vec<ThresholdResult>,
    pub started_at: DateTime<Utc>,
    pub cancelled: bool,
}

impl<D> RunReport<D> {
    /// True when every threshold held.
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn breached(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|t| !t.passed)
    }
}

impl<D> fmt::Display for RunReport<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run started {} and took {:.1}s{}",
            self.started_at.to_rfc3339(),
            self.summary.elapsed.as_secs_f64(),
            if self.cancelled { " (cancelled)" } else { "" }
        )?;
        writeln!(f)?;
        writeln!(f, "{}", self.summary)?;
        if !self.thresholds.is_empty() {
            writeln!(f)?;
            writeln!(f, "  thresholds:")?;
            for t in &self.thresholds {
                writeln!(f, "  {t}")?;
            }
        }
        Ok(())
    }
}

pub struct Runner {
    options: RunOptions,
    http: HttpClient,
    thresholds: Vec<MetricThresholds>,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(options: RunOptions, http: HttpClient, thresholds: Vec<MetricThresholds>) -> Self {
        Self {
            options,
            http,
            thresholds,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops the run early; a report is still produced.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run<S: Scenario>(&self, scenario: Arc<S>) -> RunReport<S::Data> {
        let metrics = Arc::clone(self.http.metrics());
        let started_at = Utc::now();
        let started = Instant::now();

        info!("running setup");
        let mut setup_vu = VirtualUser::new(0, self.http.clone(), self.cancel.clone());
        let data = Arc::new(scenario.setup(&mut setup_vu).await);

        info!(
            vus = self.options.vus,
            duration_s = self.options.duration.as_secs_f64(),
            "starting virtual users"
        );
        let deadline = tokio::time::Instant::now() + self.options.duration;
        let mut tasks = JoinSet::new();
        for id in 1..=self.options.vus {
            let vu = VirtualUser::new(id, self.http.clone(), self.cancel.clone());
            tasks.spawn(run_vu(
                Arc::clone(&scenario),
                vu,
                Arc::clone(&data),
                Arc::clone(&metrics),
                deadline,
            ));
        }

        tokio::select! {
            _ = sleep_until(deadline) => {}
            _ = self.cancel.cancelled() => warn!("run cancelled, stopping virtual users"),
        }

        let stop_by = tokio::time::Instant::now() + self.options.graceful_stop;
        loop {
            match timeout_at(stop_by, tasks.join_next()).await {
                Ok(Some(Ok(()))) => {}
                Ok(Some(Err(e))) if e.is_panic() => error!(error = %e, "virtual user panicked"),
                Ok(Some(Err(_))) => {}
                Ok(None) => break,
                Err(_) => {
                    let remaining = tasks.len() as u64;
                    warn!(remaining, "graceful stop elapsed, aborting virtual users");
                    tasks.abort_all();
                    metrics.record_interrupted(remaining);
                    break;
                }
            }
        }

        let summary = metrics.summary(started.elapsed());
        let thresholds = evaluate(&self.thresholds, &summary);
        info!(
            iterations = summary.iterations,
            http_reqs = summary.http_reqs,
            "run finished"
        );

        RunReport {
            setup_data: data,
            summary,
            thresholds,
            started_at,
            cancelled: self.cancel.is_cancelled(),
        }
    }
}

async fn run_vu<S: Scenario>(
    scenario: Arc<S>,
    mut vu: VirtualUser,
    data: Arc<S::Data>,
    metrics: Arc<Metrics>,
    deadline: tokio::time::Instant,
) {
    while tokio::time::Instant::now() < deadline && !vu.is_cancelled() {
        scenario.iteration(&mut vu, &data).await;
        vu.iteration += 1;
        metrics.record_iteration();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;

    fn client() -> HttpClient {
        HttpClient::new(&TargetConfig::default(), Arc::new(Metrics::new())).unwrap()
    }

    #[test]
    fn test_sequence_is_per_vu() {
        let mut a = VirtualUser::new(1, client(), CancellationToken::new());
        let mut b = VirtualUser::new(2, client(), CancellationToken::new());

        assert_eq!(a.next_sequence(), 0);
        assert_eq!(a.next_sequence(), 1);
        assert_eq!(b.next_sequence(), 0);
        assert_eq!(a.next_sequence(), 2);
    }

    #[test]
    fn test_check_records_and_returns() {
        let vu = VirtualUser::new(1, client(), CancellationToken::new());
        assert!(vu.check("ok", true));
        assert!(!vu.check("ok", false));

        let summary = vu.metrics().summary(Duration::from_secs(1));
        assert_eq!(summary.check("ok").unwrap().passes, 1);
        assert_eq!(summary.check("ok").unwrap().fails, 1);
    }

    #[tokio::test]
    async fn test_sleep_returns_on_cancel() {
        let cancel = CancellationToken::new();
        let vu = VirtualUser::new(1, client(), cancel.clone());
        cancel.cancel();

        let start = Instant::now();
        vu.sleep(Duration::from_secs(30)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_run_options_from_config() {
        let options = RunOptions::from(&LoadConfig::default());
        assert_eq!(options.vus, 20);
        assert_eq!(options.duration, Duration::from_secs(30));
        assert_eq!(options.graceful_stop, Duration::from_secs(30));
    }
}
