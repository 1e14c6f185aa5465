use std::{collections::HashSet, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    dao::{
        community_store::CommunityStore,
        models::{CommunityId, SettingsEntity, SuggestionEntity, VoteSessionEntity},
        storage::StorageResult,
    },
    state::session::CommunityState,
};

/// In-memory source of truth for every community, populated from the store at
/// startup and flushed back after every mutation.
///
/// Each community lives behind its own `Mutex`, and mutating operations hold
/// that lock across their whole read-modify-write. Because the store saves
/// whole artifacts, the registry also keeps a per-community snapshot cache of
/// the last state handed to the store; flushes serialize from that cache so
/// they never need a second community lock (no lock-order cycles between
/// concurrent operations on different communities).
pub struct SessionRegistry {
    communities: DashMap<CommunityId, Arc<Mutex<CommunityState>>>,
    settings_cache: DashMap<CommunityId, SettingsEntity>,
    suggestions_cache: DashMap<CommunityId, Vec<SuggestionEntity>>,
    votes_cache: DashMap<CommunityId, VoteSessionEntity>,
    store: Arc<dyn CommunityStore>,
}

impl SessionRegistry {
    /// Load every persisted artifact and rebuild the runtime state.
    pub async fn load(store: Arc<dyn CommunityStore>) -> StorageResult<Self> {
        let mut persisted = store.load_all().await?;

        let ids: HashSet<CommunityId> = persisted
            .settings
            .keys()
            .chain(persisted.suggestions.keys())
            .chain(persisted.votes.keys())
            .copied()
            .collect();

        let registry = Self {
            communities: DashMap::new(),
            settings_cache: DashMap::new(),
            suggestions_cache: DashMap::new(),
            votes_cache: DashMap::new(),
            store,
        };

        for id in ids {
            let state = CommunityState::from_entities(
                persisted.settings.remove(&id),
                persisted.suggestions.remove(&id).unwrap_or_default(),
                persisted.votes.remove(&id),
            );
            registry.settings_cache.insert(id, state.settings_entity());
            registry
                .suggestions_cache
                .insert(id, state.suggestions_entity());
            if let Some(votes) = state.votes_entity() {
                registry.votes_cache.insert(id, votes);
            }
            registry
                .communities
                .insert(id, Arc::new(Mutex::new(state)));
        }

        Ok(registry)
    }

    /// Handle to a community that already has a record.
    pub fn community(&self, id: CommunityId) -> Option<Arc<Mutex<CommunityState>>> {
        self.communities.get(&id).map(|entry| entry.value().clone())
    }

    /// Communities currently known to the registry.
    pub fn community_ids(&self) -> Vec<CommunityId> {
        self.communities.iter().map(|entry| *entry.key()).collect()
    }

    /// Idempotently create a community record. An existing record is left
    /// untouched; a fresh one starts from defaults and is persisted at once.
    pub async fn init_community(&self, id: CommunityId) -> Arc<Mutex<CommunityState>> {
        let (handle, created) = match self.communities.entry(id) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let state = CommunityState::default();
                self.settings_cache.insert(id, state.settings_entity());
                self.suggestions_cache.insert(id, Vec::new());
                (entry.insert(Arc::new(Mutex::new(state))).clone(), true)
            }
        };

        if created {
            self.flush_settings().await;
            self.flush_suggestions().await;
        }
        handle
    }

    /// Record the latest settings snapshot for `id`. Call while holding the
    /// community lock, before flushing.
    pub fn cache_settings(&self, id: CommunityId, entity: SettingsEntity) {
        self.settings_cache.insert(id, entity);
    }

    /// Record the latest suggestions snapshot for `id`.
    pub fn cache_suggestions(&self, id: CommunityId, rows: Vec<SuggestionEntity>) {
        self.suggestions_cache.insert(id, rows);
    }

    /// Record (or drop, for a closed round) the latest vote snapshot for `id`.
    pub fn cache_votes(&self, id: CommunityId, session: Option<VoteSessionEntity>) {
        match session {
            Some(session) => {
                self.votes_cache.insert(id, session);
            }
            None => {
                self.votes_cache.remove(&id);
            }
        }
    }

    /// Write the settings artifact. Failures are logged, never surfaced: the
    /// in-memory state stays authoritative until the next successful flush.
    pub async fn flush_settings(&self) {
        let all = self
            .settings_cache
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        if let Err(err) = self.store.save_settings(all).await {
            warn!(error = %err, "failed to flush settings; keeping in-memory state");
        }
    }

    /// Write the suggestions artifact, same failure policy as settings.
    pub async fn flush_suggestions(&self) {
        let all = self
            .suggestions_cache
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        if let Err(err) = self.store.save_suggestions(all).await {
            warn!(error = %err, "failed to flush suggestions; keeping in-memory state");
        }
    }

    /// Write the votes artifact, same failure policy as settings.
    pub async fn flush_votes(&self) {
        let all = self
            .votes_cache
            .iter()
            .map(|entry| (*entry.key(), Some(entry.value().clone())))
            .collect();
        if let Err(err) = self.store.save_votes(all).await {
            warn!(error = %err, "failed to flush votes; keeping in-memory state");
        }
    }

    /// Probe the backing store.
    pub async fn store_healthy(&self) -> bool {
        self.store.health_check().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::memory_store::MemoryStore,
        state::session::{Suggestion, VoteSession},
    };
    use std::time::UNIX_EPOCH;

    #[tokio::test]
    async fn init_community_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let registry = SessionRegistry::load(store.clone()).await.unwrap();

        let handle = registry.init_community(42).await;
        {
            let mut state = handle.lock().await;
            state.settings.announcement_channel = Some(9);
            registry.cache_settings(42, state.settings_entity());
        }
        registry.flush_settings().await;

        // A second init must not reset the mutated record.
        let handle = registry.init_community(42).await;
        let state = handle.lock().await;
        assert_eq!(state.settings.announcement_channel, Some(9));
    }

    #[tokio::test]
    async fn state_survives_a_reload() {
        let store = Arc::new(MemoryStore::new());
        let registry = SessionRegistry::load(store.clone()).await.unwrap();

        let handle = registry.init_community(7).await;
        {
            let mut state = handle.lock().await;
            state.settings.announcement_channel = Some(100);
            state.suggestions.insert(Suggestion {
                name: "Celeste".into(),
                submitter: 3,
                submitted_at: UNIX_EPOCH,
            });
            let mut session = VoteSession::open(vec!["Hades".into()]);
            session.toggle(3, "Hades");
            state.vote = Some(session);

            registry.cache_settings(7, state.settings_entity());
            registry.cache_suggestions(7, state.suggestions_entity());
            registry.cache_votes(7, state.votes_entity());
        }
        registry.flush_settings().await;
        registry.flush_suggestions().await;
        registry.flush_votes().await;

        let reloaded = SessionRegistry::load(store).await.unwrap();
        let handle = reloaded.community(7).expect("community persisted");
        let state = handle.lock().await;
        assert_eq!(state.settings.announcement_channel, Some(100));
        assert_eq!(state.suggestions.names(), vec!["Celeste"]);
        let session = state.vote.as_ref().expect("vote persisted");
        assert_eq!(session.tally(), vec![("Hades".into(), 1)]);
    }

    #[tokio::test]
    async fn closing_a_round_drops_the_votes_artifact() {
        let store = Arc::new(MemoryStore::new());
        let registry = SessionRegistry::load(store.clone()).await.unwrap();

        let handle = registry.init_community(1).await;
        {
            let mut state = handle.lock().await;
            state.vote = Some(VoteSession::open(vec!["A".into()]));
            registry.cache_votes(1, state.votes_entity());
        }
        registry.flush_votes().await;
        assert_eq!(store.snapshot().votes.len(), 1);

        {
            let mut state = handle.lock().await;
            state.vote = None;
            registry.cache_votes(1, state.votes_entity());
        }
        registry.flush_votes().await;
        assert!(store.snapshot().votes.is_empty());
    }
}
