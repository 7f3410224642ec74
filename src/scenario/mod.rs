//! Scenario hooks driven by the runner.

pub mod review;

use async_trait::async_trait;

use crate::runner::VirtualUser;

pub use review::{pull_request_id, ReviewScenario, SetupData};

/// A load test script: one setup call, then an iteration repeated by every VU.
#[async_trait]
pub trait Scenario: Send + Sync + 'static {
    /// Produced once by [`Scenario::setup`] and shared read-only with every iteration.
    type Data: Send + Sync + 'static;

    /// Runs exactly once, before any iteration, on virtual user 0.
    async fn setup(&self, vu: &mut VirtualUser) -> Self::Data;

    /// One iteration for one virtual user. Must not fail: outcomes go through checks.
    async fn iteration(&self, vu: &mut VirtualUser, data: &Self::Data);
}
