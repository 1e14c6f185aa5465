//! In-memory [`CommunityStore`] used by tests and local experiments. Saves
//! replace whole artifacts just like the file store, minus the filesystem.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::dao::{
    community_store::CommunityStore,
    models::{CommunityId, PersistedState, SettingsEntity, SuggestionEntity, VoteSessionEntity},
    storage::StorageResult,
};

/// Store holding the three artifacts behind a mutex.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<PersistedState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with persisted state, as if loaded from disk.
    pub fn seeded(state: PersistedState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Snapshot the current artifacts, e.g. to assert on what was flushed.
    pub fn snapshot(&self) -> PersistedState {
        self.inner.lock().expect("memory store poisoned").clone()
    }
}

impl CommunityStore for MemoryStore {
    fn load_all(&self) -> BoxFuture<'static, StorageResult<PersistedState>> {
        let state = self.snapshot();
        Box::pin(async move { Ok(state) })
    }

    fn save_settings(
        &self,
        all: Vec<(CommunityId, SettingsEntity)>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.lock().expect("memory store poisoned").settings = all.into_iter().collect();
            Ok(())
        })
    }

    fn save_suggestions(
        &self,
        all: Vec<(CommunityId, Vec<SuggestionEntity>)>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.lock().expect("memory store poisoned").suggestions = all.into_iter().collect();
            Ok(())
        })
    }

    fn save_votes(
        &self,
        all: Vec<(CommunityId, Option<VoteSessionEntity>)>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.lock().expect("memory store poisoned").votes = all
                .into_iter()
                .filter_map(|(id, session)| session.map(|session| (id, session)))
                .collect();
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async move { Ok(()) })
    }
}
