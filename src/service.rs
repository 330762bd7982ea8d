use chrono::Utc;
use tracing::error;
use uuid::Uuid;

use crate::error::StoreError;
use crate::identity::IdentityProvider;
use crate::models::{
    CreatePollRequest, CreatedPoll, Identity, OptionTally, Poll, PollOption, PollResults,
    StatusResponse, VotePollResponse,
};
use crate::store::Store;

/// Validating facade over the storage backend. The view layer talks to this
/// and never to the store directly.
#[derive(Clone)]
pub struct PollService {
    store: Store,
    identity: IdentityProvider,
}

impl PollService {
    pub fn new(store: Store, identity: IdentityProvider) -> Self {
        Self { store, identity }
    }

    /// Validate the request, mint poll and option ids, and insert the poll
    /// with all counts at zero.
    pub async fn create_poll(&self, data: CreatePollRequest) -> Result<CreatedPoll, StoreError> {
        let question = data.question.trim();
        if question.is_empty() {
            return Err(StoreError::Validation("Question cannot be empty".into()));
        }
        if data.options.is_empty() {
            return Err(StoreError::Validation(
                "A poll needs at least one option".into(),
            ));
        }
        if data.options.iter().any(|opt| opt.text.trim().is_empty()) {
            return Err(StoreError::Validation("Option text cannot be empty".into()));
        }

        let poll = Poll {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            options: data
                .options
                .into_iter()
                .map(|opt| PollOption {
                    id: Uuid::new_v4().to_string(),
                    text: opt.text.trim().to_string(),
                    votes: 0,
                    image_url: opt.image_url,
                })
                .collect(),
            created_at: Utc::now(),
            votes_count: 0,
            has_voted: false,
        };

        let id = poll.id.clone();
        self.store.create_poll(&poll).await?;
        Ok(CreatedPoll { id })
    }

    /// All polls annotated for the current identity. A backend fault is
    /// logged and surfaces as an empty listing rather than a fault the view
    /// layer has to guess at.
    pub async fn list_polls(&self) -> Vec<Poll> {
        let identity = self.identity.get_or_create().await;
        match self.store.list_polls(&identity.id).await {
            Ok(polls) => polls,
            Err(err) => {
                error!(%err, "failed to list polls");
                Vec::new()
            }
        }
    }

    pub async fn get_poll(&self, poll_id: &str) -> Result<Poll, StoreError> {
        let identity = self.identity.get_or_create().await;
        self.store.get_poll(poll_id, &identity.id).await
    }

    /// Cast a vote for the current identity. On success the poll is
    /// re-fetched so the caller gets a fresh snapshot with updated counts
    /// and vote annotation; on failure nothing was mutated.
    pub async fn vote(&self, poll_id: &str, option_id: &str) -> VotePollResponse {
        let identity = self.identity.get_or_create().await;

        if let Err(err) = self.store.vote(poll_id, option_id, &identity.id).await {
            if let StoreError::Storage(_) = &err {
                error!(%err, poll_id, option_id, "vote failed");
            }
            return VotePollResponse {
                success: false,
                poll: None,
                message: Some(err.user_message()),
            };
        }

        match self.store.get_poll(poll_id, &identity.id).await {
            Ok(poll) => VotePollResponse {
                success: true,
                poll: Some(poll),
                message: None,
            },
            Err(err) => {
                error!(%err, poll_id, "poll missing after committed vote");
                VotePollResponse {
                    success: false,
                    poll: None,
                    message: Some("Poll not found after voting".into()),
                }
            }
        }
    }

    /// Tally view with per-option percentages of the total.
    pub async fn results(&self, poll_id: &str) -> Result<PollResults, StoreError> {
        let poll = self.get_poll(poll_id).await?;
        let total = poll.votes_count;
        let options = poll
            .options
            .into_iter()
            .map(|opt| {
                let percentage = if total > 0 {
                    (opt.votes as f64 * 1000.0 / total as f64).round() / 10.0
                } else {
                    0.0
                };
                OptionTally {
                    id: opt.id,
                    text: opt.text,
                    votes: opt.votes,
                    percentage,
                }
            })
            .collect();
        Ok(PollResults {
            poll_id: poll.id,
            question: poll.question,
            votes_count: total,
            options,
        })
    }

    pub async fn delete_poll(&self, poll_id: &str) -> StatusResponse {
        match self.store.delete_poll(poll_id).await {
            Ok(true) => StatusResponse::ok(),
            Ok(false) => StatusResponse::failed("Poll not found"),
            Err(err) => {
                error!(%err, poll_id, "failed to delete poll");
                StatusResponse::failed(err.user_message())
            }
        }
    }

    /// The current session identity. Never fails.
    pub async fn user_info(&self) -> Identity {
        self.identity.get_or_create().await
    }

    /// Rename the current identity. Empty or whitespace-only names are
    /// rejected here and the previous name is retained.
    pub async fn update_username(&self, username: &str) -> StatusResponse {
        let username = username.trim();
        if username.is_empty() {
            return StatusResponse::failed("Username cannot be empty");
        }
        match self.identity.update_display_name(username).await {
            Ok(()) => StatusResponse::ok(),
            Err(err) => {
                error!(%err, "failed to update username");
                StatusResponse::failed(err.user_message())
            }
        }
    }
}
