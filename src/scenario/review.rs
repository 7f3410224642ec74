use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::{CreatePullRequest, ErrorCode, ErrorResponse, ReviewApi};
use crate::config::Config;
use crate::fixtures;
use crate::runner::VirtualUser;

use super::Scenario;

pub const CHECK_TEAM_READY: &str = "team created or already exists";
pub const CHECK_CREATE_PR: &str = "create PR success";
pub const CHECK_GET_REVIEW: &str = "getReview ok";

/// Handed from setup to every iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupData {
    pub team_name: String,
}

/// `pr-{vu}-{counter}`; unique as long as each VU's counter never repeats.
pub fn pull_request_id(vu: u32, counter: u64) -> String {
    format!("pr-{vu}-{counter}")
}

/// Seeds the review team once, then creates pull requests and polls the
/// reviewer's pending reviews.
#[derive(Debug, Clone)]
pub struct ReviewScenario {
    team_name: String,
    pause: Duration,
}

impl ReviewScenario {
    pub fn new(team_name: impl Into<String>, pause: Duration) -> Self {
        Self {
            team_name: team_name.into(),
            pause,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.scenario.team_name.clone(), cfg.load.iteration_pause())
    }
}

#[async_trait]
impl Scenario for ReviewScenario {
    type Data = SetupData;

    async fn setup(&self, vu: &mut VirtualUser) -> SetupData {
        let team = fixtures::team_request(&self.team_name);
        let resp = ReviewApi::new(vu.http()).add_team(&team).await;

        let ready = vu.check(CHECK_TEAM_READY, matches!(resp.status, Some(201 | 400)));
        match resp.status {
            Some(201) => info!(team = %self.team_name, members = team.members.len(), "team created"),
            Some(400) => {
                // 400 is accepted as "already exists"; only the body tells it apart
                // from a rejected payload.
                let code = resp.json::<ErrorResponse>().map(|e| e.error);
                match code.as_ref().and_then(|e| e.code()) {
                    Some(ErrorCode::TeamExists) => {
                        info!(team = %self.team_name, "team already exists")
                    }
                    _ => warn!(
                        team = %self.team_name,
                        code = code.as_ref().map_or("<none>", |e| e.code.as_str()),
                        "team setup returned 400 without TEAM_EXISTS"
                    ),
                }
            }
            _ => {}
        }
        if !ready {
            warn!(
                team = %self.team_name,
                status = ?resp.status,
                error = ?resp.error,
                "team setup failed, continuing"
            );
        }

        SetupData {
            team_name: self.team_name.clone(),
        }
    }

    async fn iteration(&self, vu: &mut VirtualUser, data: &SetupData) {
        let author = fixtures::author();
        let pr_id = pull_request_id(vu.id(), vu.next_sequence());
        let api = ReviewApi::new(vu.http());
        debug!(
            vu = vu.id(),
            iteration = vu.iteration(),
            team = %data.team_name,
            pr = %pr_id,
            "creating pull request"
        );

        let created = api
            .create_pull_request(&CreatePullRequest::new(pr_id, &author.id))
            .await;
        vu.check(CHECK_CREATE_PR, created.status_is(201));

        let reviewer = fixtures::reviewer();
        let review = api.get_review(&reviewer.id).await;
        vu.check(CHECK_GET_REVIEW, review.status_is(200));

        vu.sleep(self.pause).await;
    }
}
