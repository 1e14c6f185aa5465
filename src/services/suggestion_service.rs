use std::time::SystemTime;

use tracing::info;

use crate::{
    dao::models::{CommunityId, MemberId},
    dto::{
        common::ActionResponse,
        suggestions::{ClearSuggestionsResponse, SuggestionListResponse, SuggestionSummary},
    },
    error::ServiceError,
    services::{known_community, require_active},
    state::{SharedState, session::Suggestion},
};

/// Add `name` to the community's suggestion pool on behalf of `member`.
///
/// A case-insensitive duplicate is acknowledged without changing the pool, so
/// members never learn who suggested a game first. The quota only counts
/// suggestions still in the pool; entries consumed by a vote free the slot.
pub async fn submit(
    state: &SharedState,
    community: CommunityId,
    member: MemberId,
    name: &str,
) -> Result<ActionResponse, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "suggestion name is empty".into(),
        ));
    }

    let handle = known_community(state, community)?;
    let inserted = {
        let mut guard = handle.lock().await;
        require_active(&guard)?;

        let limit = guard.settings.max_suggestions_per_member;
        if limit > 0 {
            let submitted = guard.suggestions.count_from(member);
            if submitted >= limit {
                return Err(ServiceError::QuotaExceeded { submitted, limit });
            }
        }

        let inserted = guard.suggestions.insert(Suggestion {
            name: name.to_string(),
            submitter: member,
            submitted_at: SystemTime::now(),
        });
        if inserted {
            state
                .registry()
                .cache_suggestions(community, guard.suggestions_entity());
        }
        inserted
    };

    if inserted {
        state.registry().flush_suggestions().await;
        info!(community, member, name, "suggestion added");
    }
    Ok(ActionResponse::new(format!("`{name}` is on the list!")))
}

/// Current suggestion pool in insertion order.
pub async fn list(
    state: &SharedState,
    community: CommunityId,
) -> Result<SuggestionListResponse, ServiceError> {
    let handle = known_community(state, community)?;
    let guard = handle.lock().await;
    require_active(&guard)?;

    Ok(SuggestionListResponse {
        suggestions: guard.suggestions.iter().map(SuggestionSummary::from).collect(),
        phase: guard.phase().into(),
    })
}

/// Drop every pooled suggestion without touching an open vote.
pub async fn clear(
    state: &SharedState,
    community: CommunityId,
) -> Result<ClearSuggestionsResponse, ServiceError> {
    let handle = known_community(state, community)?;
    let cleared = {
        let mut guard = handle.lock().await;
        require_active(&guard)?;

        let cleared = !guard.suggestions.is_empty();
        guard.suggestions.clear();
        state
            .registry()
            .cache_suggestions(community, guard.suggestions_entity());
        cleared
    };

    state.registry().flush_suggestions().await;
    if cleared {
        info!(community, "suggestion pool cleared");
    }
    Ok(ClearSuggestionsResponse {
        cleared,
        message: if cleared {
            "Suggestion list cleared.".into()
        } else {
            "The suggestion list was already empty.".into()
        },
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::memory_store::MemoryStore, state::AppState, state::registry::SessionRegistry,
    };

    async fn active_state(community: CommunityId) -> SharedState {
        let registry = SessionRegistry::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        let handle = registry.init_community(community).await;
        handle.lock().await.settings.announcement_channel = Some(1);
        AppState::new(registry)
    }

    #[tokio::test]
    async fn submit_rejects_unknown_communities() {
        let state = active_state(1).await;
        let err = submit(&state, 2, 10, "Celeste").await.unwrap_err();
        assert!(matches!(err, ServiceError::Uninitialized));
    }

    #[tokio::test]
    async fn submit_enforces_the_quota() {
        let state = active_state(1).await;
        {
            let handle = state.registry().community(1).unwrap();
            handle.lock().await.settings.max_suggestions_per_member = 2;
        }

        submit(&state, 1, 10, "Celeste").await.unwrap();
        submit(&state, 1, 10, "Hades").await.unwrap();
        let err = submit(&state, 1, 10, "Factorio").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::QuotaExceeded {
                submitted: 2,
                limit: 2
            }
        ));

        // Another member still has room.
        submit(&state, 1, 11, "Factorio").await.unwrap();
    }

    #[tokio::test]
    async fn zero_quota_means_unlimited() {
        let state = active_state(1).await;
        {
            let handle = state.registry().community(1).unwrap();
            handle.lock().await.settings.max_suggestions_per_member = 0;
        }

        for name in ["A", "B", "C", "D", "E"] {
            submit(&state, 1, 10, name).await.unwrap();
        }
        let listing = list(&state, 1).await.unwrap();
        assert_eq!(listing.suggestions.len(), 5);
    }

    #[tokio::test]
    async fn duplicates_are_acknowledged_but_not_stored() {
        let state = active_state(1).await;
        submit(&state, 1, 10, "Celeste").await.unwrap();
        submit(&state, 1, 11, "  celeste  ").await.unwrap();

        let listing = list(&state, 1).await.unwrap();
        assert_eq!(listing.suggestions.len(), 1);
        assert_eq!(listing.suggestions[0].name, "Celeste");
        assert_eq!(listing.suggestions[0].submitter_id, 10);
    }

    #[tokio::test]
    async fn clear_reports_whether_anything_was_removed() {
        let state = active_state(1).await;
        submit(&state, 1, 10, "Celeste").await.unwrap();

        let first = clear(&state, 1).await.unwrap();
        assert!(first.cleared);
        let second = clear(&state, 1).await.unwrap();
        assert!(!second.cleared);
    }
}
