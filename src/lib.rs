pub mod api;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod metrics;
pub mod runner;
pub mod scenario;
pub mod telemetry;
pub mod thresholds;

pub use config::Config;
pub use error::{LoadTestError, Result};
pub use runner::{RunOptions, RunReport, Runner, VirtualUser};
pub use scenario::{ReviewScenario, Scenario, SetupData};
