use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::models::{
    CreatePollRequest, CreatedPoll, Identity, PollResults, StatusResponse, UpdateUsernameRequest,
    VotePollResponse, VoteRequest,
};
use crate::service::PollService;

/// Create a new poll from a question and a list of options.
pub async fn create_poll(
    State(service): State<PollService>,
    Json(data): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<CreatedPoll>), StoreError> {
    let created = service.create_poll(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List all polls, annotated for the current session.
pub async fn list_polls(State(service): State<PollService>) -> Json<Value> {
    let polls = service.list_polls().await;
    Json(json!({ "polls": polls }))
}

/// Fetch a single poll by id.
pub async fn get_poll(
    State(service): State<PollService>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StoreError> {
    let poll = service.get_poll(&id).await?;
    Ok(Json(json!({ "poll": poll })))
}

/// Cast a vote. Failures (already voted, unknown option) come back as a
/// non-fatal `{ success: false, message }` body.
pub async fn vote(
    State(service): State<PollService>,
    Path(id): Path<String>,
    Json(data): Json<VoteRequest>,
) -> Json<VotePollResponse> {
    Json(service.vote(&id, &data.option_id).await)
}

/// Vote tallies with percentages.
pub async fn results(
    State(service): State<PollService>,
    Path(id): Path<String>,
) -> Result<Json<PollResults>, StoreError> {
    Ok(Json(service.results(&id).await?))
}

/// Delete a poll and all of its votes.
pub async fn delete_poll(
    State(service): State<PollService>,
    Path(id): Path<String>,
) -> Json<StatusResponse> {
    Json(service.delete_poll(&id).await)
}

/// The current session identity.
pub async fn get_user(State(service): State<PollService>) -> Json<Identity> {
    Json(service.user_info().await)
}

/// Change the display name of the current session identity.
pub async fn update_username(
    State(service): State<PollService>,
    Json(data): Json<UpdateUsernameRequest>,
) -> Json<StatusResponse> {
    Json(service.update_username(&data.username).await)
}
