/// Storage trait implemented by the persistence backends.
pub mod community_store;
/// File-backed production store.
pub mod file_store;
/// In-memory store for tests.
pub mod memory_store;
/// Persisted entity definitions.
pub mod models;
/// Storage error types shared by the backends.
pub mod storage;
