//! Run Metrics and Summary
//!
//! In-memory aggregation of everything a run records: request samples, named
//! checks and iteration counts. Virtual users push into a single [`Metrics`] sink;
//! at the end of the run it is folded into a [`Summary`] which thresholds are
//! evaluated against.

use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

/// A single recorded HTTP request
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub status: Option<u16>,
    pub duration: Duration,
    /// Transport error or status outside the expected set
    pub failed: bool,
}

/// Pass/fail tally for a named check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckCounts {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Default)]
struct MetricsInner {
    requests: Vec<RequestSample>,
    checks: Vec<CheckCounts>,
    iterations: u64,
    interrupted: u64,
}

/// Thread-safe metrics sink shared by all virtual users
#[derive(Debug, Default)]
pub struct Metrics {
    inner: Mutex<MetricsInner>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, sample: RequestSample) {
        self.inner.lock().requests.push(sample);
    }

    /// Record a check outcome. Checks keep the order they were first seen in.
    pub fn record_check(&self, name: &str, passed: bool) {
        let mut inner = self.inner.lock();
        let existing = inner.checks.iter().position(|c| c.name == name);
        let idx = match existing {
            Some(idx) => idx,
            None => {
                inner.checks.push(CheckCounts {
                    name: name.to_string(),
                    passes: 0,
                    fails: 0,
                });
                inner.checks.len() - 1
            }
        };
        let counts = &mut inner.checks[idx];
        if passed {
            counts.passes += 1;
        } else {
            counts.fails += 1;
        }
    }

    pub fn record_iteration(&self) {
        self.inner.lock().iterations += 1;
    }

    pub fn record_interrupted(&self, count: u64) {
        self.inner.lock().interrupted += count;
    }

    /// Snapshot of recorded requests, in recording order.
    pub fn requests(&self) -> Vec<RequestSample> {
        self.inner.lock().requests.clone()
    }

    pub fn summary(&self, elapsed: Duration) -> Summary {
        let inner = self.inner.lock();

        let durations = inner.requests.iter().map(|r| r.duration).collect();
        let failed = inner.requests.iter().filter(|r| r.failed).count() as u64;

        Summary {
            http_reqs: inner.requests.len() as u64,
            http_req_duration: Trend::from_durations(durations),
            http_req_failed: Rate {
                hits: failed,
                total: inner.requests.len() as u64,
            },
            checks: inner.checks.clone(),
            iterations: inner.iterations,
            iterations_interrupted: inner.interrupted,
            elapsed,
        }
    }
}

/// Distribution of a timing metric, in milliseconds
#[derive(Debug, Clone, Default)]
pub struct Trend {
    sorted_ms: Vec<f64>,
}

impl Trend {
    pub fn from_durations(durations: Vec<Duration>) -> Self {
        let mut sorted_ms: Vec<f64> = durations
            .into_iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        sorted_ms.sort_by(|a, b| a.total_cmp(b));
        Self { sorted_ms }
    }

    pub fn count(&self) -> usize {
        self.sorted_ms.len()
    }

    pub fn min(&self) -> f64 {
        self.sorted_ms.first().copied().unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.sorted_ms.last().copied().unwrap_or(0.0)
    }

    pub fn avg(&self) -> f64 {
        if self.sorted_ms.is_empty() {
            return 0.0;
        }
        self.sorted_ms.iter().sum::<f64>() / self.sorted_ms.len() as f64
    }

    pub fn med(&self) -> f64 {
        self.percentile(50.0)
    }

    /// Linear interpolation between the two closest ranks.
    pub fn percentile(&self, p: f64) -> f64 {
        let n = self.sorted_ms.len();
        match n {
            0 => 0.0,
            1 => self.sorted_ms[0],
            _ => {
                let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
                let lower = rank.floor() as usize;
                let upper = rank.ceil() as usize;
                let weight = rank - lower as f64;
                self.sorted_ms[lower] + (self.sorted_ms[upper] - self.sorted_ms[lower]) * weight
            }
        }
    }
}

/// Fraction of `total` events that were hits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rate {
    pub hits: u64,
    pub total: u64,
}

impl Rate {
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }
}

/// Aggregated metrics of a finished run
#[derive(Debug, Clone)]
pub struct Summary {
    pub http_reqs: u64,
    pub http_req_duration: Trend,
    pub http_req_failed: Rate,
    pub checks: Vec<CheckCounts>,
    pub iterations: u64,
    pub iterations_interrupted: u64,
    pub elapsed: Duration,
}

impl Summary {
    pub fn check(&self, name: &str) -> Option<&CheckCounts> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Share of passed checks across all check names.
    pub fn checks_rate(&self) -> Rate {
        self.checks.iter().fold(Rate::default(), |acc, c| Rate {
            hits: acc.hits + c.passes,
            total: acc.total + c.passes + c.fails,
        })
    }

    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.http_reqs as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            let mark = if check.fails == 0 { '✓' } else { '✗' };
            writeln!(
                f,
                "  {mark} {} ({} passed, {} failed)",
                check.name, check.passes, check.fails
            )?;
        }
        writeln!(f)?;

        let checks = self.checks_rate();
        writeln!(
            f,
            "  checks.........................: {:.2}% {} out of {}",
            checks.rate() * 100.0,
            checks.hits,
            checks.total
        )?;
        let d = &self.http_req_duration;
        writeln!(
            f,
            "  http_req_duration..............: avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms",
            d.avg(),
            d.min(),
            d.med(),
            d.max(),
            d.percentile(90.0),
            d.percentile(95.0)
        )?;
        writeln!(
            f,
            "  http_req_failed................: {:.2}% {} out of {}",
            self.http_req_failed.rate() * 100.0,
            self.http_req_failed.hits,
            self.http_req_failed.total
        )?;
        writeln!(
            f,
            "  http_reqs......................: {} {:.2}/s",
            self.http_reqs,
            self.requests_per_second()
        )?;
        write!(
            f,
            "  iterations.....................: {} ({} interrupted)",
            self.iterations, self.iterations_interrupted
        )
    }
}
