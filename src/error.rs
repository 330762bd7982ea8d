use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::StatusResponse;

/// Everything that can go wrong between the service facade and the storage
/// backend. Validation failures never reach the store; storage faults carry
/// the underlying sqlx error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Poll not found")]
    NotFound,

    #[error("Option not found")]
    OptionNotFound,

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Poll id already exists")]
    DuplicateId,

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl StoreError {
    /// Message safe to show to the user. Storage faults are logged where they
    /// occur and surfaced as a generic retry hint.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Storage(_) => "Something went wrong, please try again".to_string(),
            other => other.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound | StoreError::OptionNotFound => StatusCode::NOT_FOUND,
            StoreError::AlreadyVoted | StoreError::DuplicateId => StatusCode::CONFLICT,
            StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = StatusResponse::failed(self.user_message());
        (status, Json(body)).into_response()
    }
}

/// True when the database rejected a write because of a unique-key clash.
/// Used to turn raw constraint failures into `DuplicateId`/`AlreadyVoted`.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation)
}
