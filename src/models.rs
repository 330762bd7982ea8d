use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single answer within a poll, accumulating votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    pub votes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A poll with its ordered options. `has_voted` is recomputed at read time
/// from the vote ledger for the identity performing the read; it is never
/// stored on the poll itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub created_at: DateTime<Utc>,
    pub votes_count: i64,
    pub has_voted: bool,
}

/// Immutable fact binding one identity to one option within one poll.
/// Uniqueness of `(poll_id, identity_id)` is what enforces one vote per
/// identity per poll.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoteRecord {
    pub poll_id: String,
    pub identity_id: String,
    pub option_id: String,
    pub cast_at: DateTime<Utc>,
}

/// Anonymous per-session identity. A deduplication and display token, not an
/// authentication principal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    pub id: String,
    pub username: String,
}

impl Identity {
    /// Identity with the default display name derived from the token prefix.
    pub fn default_for(id: &str) -> Self {
        let prefix: String = id.chars().take(4).collect();
        Self {
            id: id.to_string(),
            username: format!("Anonymous_{prefix}"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOption {
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// User-provided details to create a poll.
#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<CreateOption>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPoll {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option_id: String,
}

/// Outcome of a vote: on success carries a fresh snapshot of the poll, on
/// failure carries a user-facing message and nothing was mutated.
#[derive(Debug, Serialize)]
pub struct VotePollResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Generic outcome shape for mutating operations.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct OptionTally {
    pub id: String,
    pub text: String,
    pub votes: i64,
    pub percentage: f64,
}

/// Tally view of a poll with per-option percentages.
#[derive(Debug, Serialize)]
pub struct PollResults {
    pub poll_id: String,
    pub question: String,
    pub votes_count: i64,
    pub options: Vec<OptionTally>,
}
