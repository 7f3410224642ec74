use serde::{Deserialize, Serialize};

/// Body of `POST /team/add`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAddRequest {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// Body of `POST /pullRequest/create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

impl CreatePullRequest {
    pub fn new(pull_request_id: String, author_id: &str) -> Self {
        Self {
            pull_request_name: format!("Test PR {pull_request_id}"),
            pull_request_id,
            author_id: author_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_pull_request_body() {
        let body = CreatePullRequest::new("pr-3-6".to_string(), "u1");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "pull_request_id": "pr-3-6",
                "pull_request_name": "Test PR pr-3-6",
                "author_id": "u1",
            })
        );
    }
}
