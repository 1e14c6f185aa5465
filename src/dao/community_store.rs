use futures::future::BoxFuture;

use crate::dao::models::{
    CommunityId, PersistedState, SettingsEntity, SuggestionEntity, VoteSessionEntity,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for community settings, suggestion
/// pools, and open vote sessions.
///
/// Saves are whole-collection: callers hand over the full set of records for
/// an artifact and the store replaces it atomically. The three artifacts are
/// independent so a corrupt or missing one never blocks loading the others.
pub trait CommunityStore: Send + Sync {
    /// Load every artifact at startup; absent artifacts yield empty maps.
    fn load_all(&self) -> BoxFuture<'static, StorageResult<PersistedState>>;
    /// Replace the settings artifact.
    fn save_settings(
        &self,
        all: Vec<(CommunityId, SettingsEntity)>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace the suggestions artifact.
    fn save_suggestions(
        &self,
        all: Vec<(CommunityId, Vec<SuggestionEntity>)>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace the votes artifact; `None` removes a community's session.
    fn save_votes(
        &self,
        all: Vec<(CommunityId, Option<VoteSessionEntity>)>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Probe that the backing medium is still writable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
