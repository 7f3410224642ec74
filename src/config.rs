use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::Validate;

use crate::error::Result;
use crate::thresholds::{parse_thresholds, MetricThresholds};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub target: TargetConfig,
    #[validate(nested)]
    pub load: LoadConfig,
    #[validate(nested)]
    pub scenario: ScenarioConfig,
    /// Metric name to threshold expressions, e.g. `http_req_duration = ["p(95)<300"]`
    pub thresholds: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TargetConfig {
    #[validate(url)]
    pub base_url: String,
    #[validate(range(min = 1))]
    pub http_timeout_seconds: u64,
    pub user_agent: String,
}

impl TargetConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            http_timeout_seconds: 60,
            user_agent: concat!("reviewer-loadtest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoadConfig {
    #[validate(range(min = 1))]
    pub vus: u32,
    #[validate(range(min = 1))]
    pub duration_seconds: u64,
    pub iteration_pause_ms: u64,
    pub graceful_stop_seconds: u64,
}

impl LoadConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    pub fn iteration_pause(&self) -> Duration {
        Duration::from_millis(self.iteration_pause_ms)
    }

    pub fn graceful_stop(&self) -> Duration {
        Duration::from_secs(self.graceful_stop_seconds)
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            vus: 20,
            duration_seconds: 30,
            iteration_pause_ms: 500,
            graceful_stop_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ScenarioConfig {
    #[validate(length(min = 1))]
    pub team_name: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            team_name: "backend".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            load: LoadConfig::default(),
            scenario: ScenarioConfig::default(),
            thresholds: BTreeMap::from([
                ("http_req_duration".to_string(), vec!["p(95)<300".to_string()]),
                ("http_req_failed".to_string(), vec!["rate<0.001".to_string()]),
            ]),
        }
    }
}

impl Config {
    /// Built-in defaults, then `config/default.toml`, then `LOADTEST__*` variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("LOADTEST__").split("__"))
    }

    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        cfg.thresholds()?;
        Ok(cfg)
    }

    pub fn thresholds(&self) -> Result<Vec<MetricThresholds>> {
        parse_thresholds(&self.thresholds)
    }
}
