/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Outbound prompt and announcement publishing.
pub mod publisher;
/// Vote round opening and closing.
pub mod round_service;
/// Community settings management.
pub mod settings_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Suggestion pool operations.
pub mod suggestion_service;
/// Ballot toggles and tallies.
pub mod vote_service;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    dao::models::CommunityId,
    error::ServiceError,
    state::{SharedState, session::CommunityState},
};

/// Handle to a community that already has a record.
pub(crate) fn known_community(
    state: &SharedState,
    id: CommunityId,
) -> Result<Arc<Mutex<CommunityState>>, ServiceError> {
    state
        .registry()
        .community(id)
        .ok_or(ServiceError::Uninitialized)
}

/// Guard operations against a community that has not been set up yet.
pub(crate) fn require_active(state: &CommunityState) -> Result<(), ServiceError> {
    if state.settings.is_active() {
        Ok(())
    } else {
        Err(ServiceError::Uninitialized)
    }
}
