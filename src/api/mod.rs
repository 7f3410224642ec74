//! Client side of the reviewer service HTTP API.

pub mod client;
pub mod dto;
pub mod error;

pub use client::{ReviewApi, CREATE_PULL_REQUEST_PATH, GET_REVIEW_PATH, TEAM_ADD_PATH};
pub use dto::{CreatePullRequest, TeamAddRequest, TeamMember};
pub use error::{ErrorBody, ErrorCode, ErrorResponse};
