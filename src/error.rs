use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Conditions detected by the engine. All of them are recoverable and are
/// returned to the command layer for user-facing messaging, never thrown.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The community has no announcement channel configured yet.
    #[error("game nights are not set up for this community yet")]
    Uninitialized,
    /// The member already has their maximum number of open suggestions.
    #[error("suggestion quota reached ({submitted}/{limit})")]
    QuotaExceeded {
        /// Suggestions the member currently has in the pool.
        submitted: u32,
        /// Configured per-member maximum.
        limit: u32,
    },
    /// The toggled option is not part of the open vote (stale prompt UI).
    #[error("`{0}` is not an option in the current vote")]
    UnknownOption(String),
    /// A close or toggle arrived while no vote was open.
    #[error("no vote is currently open")]
    NoOpenVote,
    /// A vote cannot open over an empty suggestion pool.
    #[error("there are no suggestions to vote on")]
    NoSuggestions,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Storage backend failed outside the tolerated flush path.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Uninitialized
            | ServiceError::NoOpenVote
            | ServiceError::NoSuggestions => AppError::Conflict(err.to_string()),
            ServiceError::QuotaExceeded { .. } => AppError::Conflict(err.to_string()),
            ServiceError::UnknownOption(_) => AppError::NotFound(err.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
