#![allow(dead_code)]
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

use reviewer_loadtest::config::TargetConfig;
use reviewer_loadtest::http::HttpClient;
use reviewer_loadtest::metrics::Metrics;
use reviewer_loadtest::VirtualUser;

/// HTTP client pointed at `base_url` with a fresh metrics sink.
pub fn client_for(base_url: &str) -> HttpClient {
    let target = TargetConfig {
        base_url: base_url.to_string(),
        http_timeout_seconds: 5,
        ..TargetConfig::default()
    };
    HttpClient::new(&target, Arc::new(Metrics::new())).expect("client")
}

pub fn vu_for(server: &MockServer, id: u32) -> VirtualUser {
    VirtualUser::new(id, client_for(&server.uri()), CancellationToken::new())
}

/// `pull_request_id` of every create request the server received, in order.
pub async fn created_pull_request_ids(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/pullRequest/create")
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).expect("json body");
            body["pull_request_id"].as_str().expect("id").to_string()
        })
        .collect()
}
