use tracing::info;

use crate::{
    dao::models::CommunityId,
    dto::settings::{SettingsResponse, UpdateSettingsRequest},
    error::ServiceError,
    services::{known_community, require_active},
    state::SharedState,
};

/// Current settings record for an active community.
pub async fn get(
    state: &SharedState,
    community: CommunityId,
) -> Result<SettingsResponse, ServiceError> {
    let handle = known_community(state, community)?;
    let guard = handle.lock().await;
    require_active(&guard)?;
    Ok(SettingsResponse::from(&guard.settings))
}

/// Apply a partial settings update.
///
/// Setting `announcement_channel` initializes the community record when none
/// exists yet; every other field requires the community to be active already.
pub async fn update(
    state: &SharedState,
    community: CommunityId,
    request: UpdateSettingsRequest,
) -> Result<SettingsResponse, ServiceError> {
    if request.is_empty() {
        return Err(ServiceError::InvalidInput(
            "no settings fields provided".into(),
        ));
    }

    let handle = if request.announcement_channel.is_some() {
        state.registry().init_community(community).await
    } else {
        known_community(state, community)?
    };

    let response = {
        let mut guard = handle.lock().await;
        if let Some(channel) = request.announcement_channel {
            guard.settings.announcement_channel = Some(channel);
        }
        if request.touches_settings() {
            require_active(&guard)?;
        }

        if let Some(value) = request.vote_channel {
            guard.settings.vote_channel = value;
        }
        if let Some(value) = request.announcement_role {
            guard.settings.announcement_role = value;
        }
        if let Some(value) = request.vote_role {
            guard.settings.vote_role = value;
        }
        if let Some(value) = request.max_suggestions_per_member {
            guard.settings.max_suggestions_per_member = value;
        }
        if let Some(value) = request.retain_threshold {
            guard.settings.retain_threshold = value;
        }

        state
            .registry()
            .cache_settings(community, guard.settings_entity());
        SettingsResponse::from(&guard.settings)
    };

    state.registry().flush_settings().await;
    info!(community, "settings updated");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::memory_store::MemoryStore,
        state::{AppState, SharedState, registry::SessionRegistry},
    };

    async fn empty_state() -> SharedState {
        let registry = SessionRegistry::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        AppState::new(registry)
    }

    #[tokio::test]
    async fn setting_the_announcement_channel_initializes_the_community() {
        let state = empty_state().await;
        assert!(matches!(
            get(&state, 1).await.unwrap_err(),
            ServiceError::Uninitialized
        ));

        let response = update(
            &state,
            1,
            UpdateSettingsRequest {
                announcement_channel: Some(100),
                ..UpdateSettingsRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(response.announcement_channel, Some(100));

        let fetched = get(&state, 1).await.unwrap();
        assert_eq!(fetched.max_suggestions_per_member, 3);
        assert_eq!(fetched.retain_threshold, 2);
    }

    #[tokio::test]
    async fn other_fields_require_an_active_community() {
        let state = empty_state().await;
        let err = update(
            &state,
            1,
            UpdateSettingsRequest {
                retain_threshold: Some(5),
                ..UpdateSettingsRequest::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Uninitialized));
    }

    #[tokio::test]
    async fn explicit_null_clears_a_clearable_field() {
        let state = empty_state().await;
        update(
            &state,
            1,
            UpdateSettingsRequest {
                announcement_channel: Some(100),
                vote_channel: Some(Some(200)),
                vote_role: Some(Some(7)),
                ..UpdateSettingsRequest::default()
            },
        )
        .await
        .unwrap();

        let response = update(
            &state,
            1,
            UpdateSettingsRequest {
                vote_channel: Some(None),
                ..UpdateSettingsRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(response.vote_channel, None);
        // Untouched fields keep their values.
        assert_eq!(response.vote_role, Some(7));
    }

    #[tokio::test]
    async fn empty_updates_are_rejected() {
        let state = empty_state().await;
        let err = update(&state, 1, UpdateSettingsRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
