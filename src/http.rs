//! Timed HTTP calls that feed the run metrics.
//!
//! Every request is recorded as a sample, whether it got a response or failed at
//! the transport level. Callers always get an [`HttpResponse`] back; there is no
//! error path, because a failed request must never stop a virtual user.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::debug;

use crate::config::TargetConfig;
use crate::error::{LoadTestError, Result};
use crate::metrics::{Metrics, RequestSample};

/// HTTP method of a recorded request
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// Statuses that count as a successful request for `http_req_failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExpectedStatuses {
    /// 200..=399
    #[default]
    Success,
    /// Only the listed codes
    Only(Vec<u16>),
}

impl ExpectedStatuses {
    pub fn only(codes: &[u16]) -> Self {
        ExpectedStatuses::Only(codes.to_vec())
    }

    pub fn contains(&self, status: u16) -> bool {
        match self {
            ExpectedStatuses::Success => (200..400).contains(&status),
            ExpectedStatuses::Only(codes) => codes.contains(&status),
        }
    }
}

/// Outcome of a single request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// `None` when no response was received
    pub status: Option<u16>,
    pub body: String,
    pub duration: Duration,
    /// Transport error message, if any
    pub error: Option<String>,
}

impl HttpResponse {
    pub fn status_is(&self, code: u16) -> bool {
        self.status == Some(code)
    }

    /// Parse the body as JSON, `None` if it is not valid for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Shared HTTP client bound to the target's base URL
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    metrics: Arc<Metrics>,
}

impl HttpClient {
    pub fn new(target: &TargetConfig, metrics: Arc<Metrics>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&target.user_agent)
                .map_err(|_| LoadTestError::InvalidHeader(target.user_agent.clone()))?,
        );
        reqwest::Url::parse(&target.base_url)
            .map_err(|e| LoadTestError::InvalidBaseUrl(format!("{}: {e}", target.base_url)))?;
        let client = reqwest::Client::builder()
            .timeout(target.http_timeout())
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: target.base_url.trim_end_matches('/').to_string(),
            metrics,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// POST a JSON body. `reqwest` sets `Content-Type: application/json`.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        expected: &ExpectedStatuses,
    ) -> HttpResponse {
        let request = self.client.post(self.url(path)).json(body);
        self.execute(Method::Post, path, request, expected).await
    }

    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        expected: &ExpectedStatuses,
    ) -> HttpResponse {
        let request = self.client.get(self.url(path)).query(query);
        self.execute(Method::Get, path, request, expected).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        request: reqwest::RequestBuilder,
        expected: &ExpectedStatuses,
    ) -> HttpResponse {
        let start = Instant::now();
        let result = match request.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                resp.text().await.map(|body| (status, body))
            }
            Err(e) => Err(e),
        };
        let duration = start.elapsed();

        let response = match result {
            Ok((status, body)) => HttpResponse {
                status: Some(status),
                body,
                duration,
                error: None,
            },
            Err(e) => {
                debug!(%method, path, error = %e, "request failed");
                HttpResponse {
                    status: None,
                    body: String::new(),
                    duration,
                    error: Some(e.to_string()),
                }
            }
        };

        let failed = response.status.map_or(true, |s| !expected.contains(s));
        self.metrics.record_request(RequestSample {
            status: response.status,
            duration,
            failed,
        });

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_expected_statuses() {
        let expected = ExpectedStatuses::default();
        assert!(expected.contains(200));
        assert!(expected.contains(201));
        assert!(expected.contains(302));
        assert!(!expected.contains(400));
        assert!(!expected.contains(500));
    }

    #[test]
    fn test_explicit_expected_statuses() {
        let expected = ExpectedStatuses::only(&[201, 400]);
        assert!(expected.contains(201));
        assert!(expected.contains(400));
        assert!(!expected.contains(200));
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Post.to_string(), "POST");
        assert_eq!(Method::Get.to_string(), "GET");
    }

    #[test]
    fn test_url_joins_paths() {
        let target = TargetConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..TargetConfig::default()
        };
        let client = HttpClient::new(&target, Arc::new(Metrics::new())).unwrap();

        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/team/add"), "http://localhost:8080/team/add");
        assert_eq!(client.url("users/getReview"), "http://localhost:8080/users/getReview");
    }
}
