//! Pass/fail criteria on aggregate metrics.
//!
//! Expressions follow the familiar load-testing syntax: `p(95)<300` on a timing
//! metric (milliseconds) or `rate<0.001` on a rate metric.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{LoadTestError, Result};
use crate::metrics::Summary;

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdParseError {
    #[error("no comparison operator in '{0}'")]
    MissingOperator(String),
    #[error("invalid threshold value '{0}'")]
    InvalidValue(String),
    #[error("unknown aggregation '{0}'")]
    UnknownAggregation(String),
    #[error("percentile out of range: {0}")]
    InvalidPercentile(f64),
    #[error("aggregation '{aggregation}' does not apply to {kind} metrics")]
    IncompatibleAggregation { aggregation: String, kind: &'static str },
}

/// Metrics thresholds can be declared on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MetricName {
    HttpReqDuration,
    HttpReqFailed,
    HttpReqs,
    Checks,
    Iterations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKind {
    Trend,
    Rate,
    Counter,
}

impl MetricKind {
    fn as_str(self) -> &'static str {
        match self {
            MetricKind::Trend => "trend",
            MetricKind::Rate => "rate",
            MetricKind::Counter => "counter",
        }
    }
}

impl MetricName {
    fn kind(self) -> MetricKind {
        match self {
            MetricName::HttpReqDuration => MetricKind::Trend,
            MetricName::HttpReqFailed | MetricName::Checks => MetricKind::Rate,
            MetricName::HttpReqs | MetricName::Iterations => MetricKind::Counter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Percentile(f64),
    Avg,
    Min,
    Max,
    Med,
    Rate,
    Count,
}

impl Aggregation {
    fn applies_to(self, kind: MetricKind) -> bool {
        match self {
            Aggregation::Percentile(_)
            | Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::Med => kind == MetricKind::Trend,
            Aggregation::Rate => kind != MetricKind::Trend,
            Aggregation::Count => kind == MetricKind::Counter,
        }
    }
}

impl FromStr for Aggregation {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg" => Ok(Aggregation::Avg),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "med" => Ok(Aggregation::Med),
            "rate" => Ok(Aggregation::Rate),
            "count" => Ok(Aggregation::Count),
            _ => {
                let inner = s
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(|| ThresholdParseError::UnknownAggregation(s.to_string()))?;
                let p: f64 = inner
                    .trim()
                    .parse()
                    .map_err(|_| ThresholdParseError::UnknownAggregation(s.to_string()))?;
                if !(0.0..=100.0).contains(&p) {
                    return Err(ThresholdParseError::InvalidPercentile(p));
                }
                Ok(Aggregation::Percentile(p))
            }
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Percentile(p) => write!(f, "p({p})"),
            Aggregation::Avg => write!(f, "avg"),
            Aggregation::Min => write!(f, "min"),
            Aggregation::Max => write!(f, "max"),
            Aggregation::Med => write!(f, "med"),
            Aggregation::Rate => write!(f, "rate"),
            Aggregation::Count => write!(f, "count"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    const OPERATORS: [(&'static str, Comparison); 5] = [
        ("<=", Comparison::Le),
        (">=", Comparison::Ge),
        ("==", Comparison::Eq),
        ("<", Comparison::Lt),
        (">", Comparison::Gt),
    ];

    fn holds(self, observed: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
            Comparison::Gt => observed > bound,
            Comparison::Ge => observed >= bound,
            Comparison::Eq => (observed - bound).abs() < f64::EPSILON,
        }
    }
}

/// A single parsed threshold expression
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub bound: f64,
    expression: String,
}

impl Threshold {
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl FromStr for Threshold {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expression: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let (pos, op, comparison) = Comparison::OPERATORS
            .iter()
            .filter_map(|(op, cmp)| expression.find(op).map(|pos| (pos, *op, *cmp)))
            // at equal positions the longer operator wins, so `<=` is not read as `<`
            .min_by_key(|(pos, op, _)| (*pos, std::cmp::Reverse(op.len())))
            .ok_or_else(|| ThresholdParseError::MissingOperator(s.to_string()))?;

        let aggregation: Aggregation = expression[..pos].parse()?;
        let value = &expression[pos + op.len()..];
        let bound: f64 = value
            .parse()
            .map_err(|_| ThresholdParseError::InvalidValue(value.to_string()))?;

        Ok(Threshold {
            aggregation,
            comparison,
            bound,
            expression,
        })
    }
}

/// All thresholds declared on one metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricThresholds {
    pub metric: MetricName,
    pub thresholds: Vec<Threshold>,
}

/// Outcome of one threshold at the end of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResult {
    pub metric: MetricName,
    pub expression: String,
    pub observed: f64,
    pub passed: bool,
}

impl fmt::Display for ThresholdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { '✓' } else { '✗' };
        write!(
            f,
            "  {mark} {}: '{}' (observed {:.4})",
            self.metric, self.expression, self.observed
        )
    }
}

/// Parse the `[thresholds]` table of the configuration.
pub fn parse_thresholds(raw: &BTreeMap<String, Vec<String>>) -> Result<Vec<MetricThresholds>> {
    raw.iter()
        .map(|(name, expressions)| -> Result<MetricThresholds> {
            let metric: MetricName = name
                .parse()
                .map_err(|_| LoadTestError::UnknownMetric(name.clone()))?;
            let thresholds = expressions
                .iter()
                .map(|expr| -> Result<Threshold, ThresholdParseError> {
                    let threshold: Threshold = expr.parse()?;
                    if !threshold.aggregation.applies_to(metric.kind()) {
                        return Err(ThresholdParseError::IncompatibleAggregation {
                            aggregation: threshold.aggregation.to_string(),
                            kind: metric.kind().as_str(),
                        });
                    }
                    Ok(threshold)
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| LoadTestError::Threshold {
                    metric: name.clone(),
                    source,
                })?;
            Ok(MetricThresholds { metric, thresholds })
        })
        .collect()
}

fn observe(summary: &Summary, metric: MetricName, aggregation: Aggregation) -> f64 {
    let d = &summary.http_req_duration;
    match (metric, aggregation) {
        (MetricName::HttpReqDuration, Aggregation::Percentile(p)) => d.percentile(p),
        (MetricName::HttpReqDuration, Aggregation::Avg) => d.avg(),
        (MetricName::HttpReqDuration, Aggregation::Min) => d.min(),
        (MetricName::HttpReqDuration, Aggregation::Max) => d.max(),
        (MetricName::HttpReqDuration, Aggregation::Med) => d.med(),
        (MetricName::HttpReqFailed, _) => summary.http_req_failed.rate(),
        (MetricName::Checks, _) => summary.checks_rate().rate(),
        (MetricName::HttpReqs, Aggregation::Rate) => summary.requests_per_second(),
        (MetricName::HttpReqs, _) => summary.http_reqs as f64,
        (MetricName::Iterations, Aggregation::Rate) => {
            let secs = summary.elapsed.as_secs_f64();
            if secs > 0.0 {
                summary.iterations as f64 / secs
            } else {
                0.0
            }
        }
        (MetricName::Iterations, _) => summary.iterations as f64,
        // parse_thresholds rejects the remaining combinations
        (MetricName::HttpReqDuration, _) => f64::NAN,
    }
}

/// Evaluate every threshold against the run summary.
pub fn evaluate(thresholds: &[MetricThresholds], summary: &Summary) -> Vec<ThresholdResult> {
    thresholds
        .iter()
        .flat_map(|set| {
            set.thresholds.iter().map(move |t| {
                let observed = observe(summary, set.metric, t.aggregation);
                ThresholdResult {
                    metric: set.metric,
                    expression: t.expression().to_string(),
                    observed,
                    passed: t.comparison.holds(observed, t.bound),
                }
            })
        })
        .collect()
}
