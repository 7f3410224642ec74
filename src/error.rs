use thiserror::Error;

use crate::thresholds::ThresholdParseError;

/// Errors that stop a run before any load is generated.
///
/// Failures of individual requests are never surfaced through this type; they are
/// recorded as failed samples and checks instead.
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid threshold on {metric}: {source}")]
    Threshold {
        metric: String,
        #[source]
        source: ThresholdParseError,
    },

    #[error("Unknown metric in thresholds: {0}")]
    UnknownMetric(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl From<figment::Error> for LoadTestError {
    fn from(error: figment::Error) -> Self {
        LoadTestError::Config(Box::new(error))
    }
}

pub type Result<T, E = LoadTestError> = std::result::Result<T, E>;
