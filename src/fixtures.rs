//! Seed users shared by every virtual user.
//!
//! The set is built once on first access and only ever handed out as a shared
//! slice, so all virtual users read the same allocation.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::api::{TeamAddRequest, TeamMember};

/// A seeded backend user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    fn new(id: &str, username: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
        }
    }
}

static USERS: Lazy<Vec<User>> = Lazy::new(|| {
    vec![
        User::new("u1", "user1"),
        User::new("u2", "user2"),
        User::new("u3", "user3"),
        User::new("u4", "user4"),
        User::new("u5", "user5"),
    ]
});

/// All fixture users, in seed order.
pub fn users() -> &'static [User] {
    &USERS
}

/// The user every generated pull request is authored by.
pub fn author() -> &'static User {
    &USERS[0]
}

/// The user whose pending reviews are fetched on every iteration.
pub fn reviewer() -> &'static User {
    &USERS[1]
}

/// Build the team seeding request with every fixture user as an active member.
pub fn team_request(team_name: &str) -> TeamAddRequest {
    TeamAddRequest {
        team_name: team_name.to_string(),
        members: users()
            .iter()
            .map(|u| TeamMember {
                user_id: u.id.clone(),
                username: u.username.clone(),
                is_active: true,
            })
            .collect(),
    }
}
