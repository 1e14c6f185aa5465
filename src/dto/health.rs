use serde::Serialize;
use utoipa::ToSchema;

/// Health status of the backend and its storage directory.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when storage is writable, `degraded` otherwise.
    pub status: String,
    /// Whether the storage probe succeeded.
    pub storage: bool,
}
