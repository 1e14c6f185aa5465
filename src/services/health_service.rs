use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the backing store and report overall health.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let storage = state.registry().store_healthy().await;
    if !storage {
        warn!("storage health check failed");
    }

    HealthResponse {
        status: if storage { "ok" } else { "degraded" }.to_string(),
        storage,
    }
}
