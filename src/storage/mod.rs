use std::future::Future;

use chrono::{DateTime, Utc};

use crate::models::Paste;

pub mod database;
pub mod memory;

pub use database::Database;
pub use memory::MemoryStore;

/// Persistent paste records, keyed by id with a secondary fingerprint index.
pub trait PasteStore: Send + Sync {
    /// Get the oldest paste with a fingerprint.
    fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> impl Future<Output = crate::ApiResult<Option<Paste>>> + Send;

    /// Get a paste by id.
    fn find_by_id(&self, id: &str) -> impl Future<Output = crate::ApiResult<Option<Paste>>> + Send;

    /// Insert a paste, failing with [`crate::ApiError::Conflict`] if the id is taken.
    fn insert(&self, paste: &Paste) -> impl Future<Output = crate::ApiResult<()>> + Send;

    /// Delete a paste by id. Deleting a missing paste is not an error.
    fn delete_by_id(&self, id: &str) -> impl Future<Output = crate::ApiResult<()>> + Send;

    /// Delete a paste only if the delete key matches, returning whether a paste was removed.
    fn delete_by_id_and_key(
        &self,
        id: &str,
        delete_key: &str,
    ) -> impl Future<Output = crate::ApiResult<bool>> + Send;

    /// Delete every paste that expired at or before `now`, returning how many were removed.
    fn delete_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = crate::ApiResult<u64>> + Send;
}

#[derive(Clone)]
pub enum AnyStorage {
    Database(Database),
    Memory(MemoryStore),
}

impl PasteStore for AnyStorage {
    async fn find_by_fingerprint(&self, fingerprint: &str) -> crate::ApiResult<Option<Paste>> {
        match self {
            AnyStorage::Database(db) => db.find_by_fingerprint(fingerprint).await,
            AnyStorage::Memory(memory) => memory.find_by_fingerprint(fingerprint).await,
        }
    }

    async fn find_by_id(&self, id: &str) -> crate::ApiResult<Option<Paste>> {
        match self {
            AnyStorage::Database(db) => db.find_by_id(id).await,
            AnyStorage::Memory(memory) => memory.find_by_id(id).await,
        }
    }

    async fn insert(&self, paste: &Paste) -> crate::ApiResult<()> {
        match self {
            AnyStorage::Database(db) => db.insert(paste).await,
            AnyStorage::Memory(memory) => memory.insert(paste).await,
        }
    }

    async fn delete_by_id(&self, id: &str) -> crate::ApiResult<()> {
        match self {
            AnyStorage::Database(db) => db.delete_by_id(id).await,
            AnyStorage::Memory(memory) => memory.delete_by_id(id).await,
        }
    }

    async fn delete_by_id_and_key(&self, id: &str, delete_key: &str) -> crate::ApiResult<bool> {
        match self {
            AnyStorage::Database(db) => db.delete_by_id_and_key(id, delete_key).await,
            AnyStorage::Memory(memory) => memory.delete_by_id_and_key(id, delete_key).await,
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> crate::ApiResult<u64> {
        match self {
            AnyStorage::Database(db) => db.delete_expired(now).await,
            AnyStorage::Memory(memory) => memory.delete_expired(now).await,
        }
    }
}

impl From<Database> for AnyStorage {
    fn from(value: Database) -> Self {
        AnyStorage::Database(value)
    }
}

impl From<MemoryStore> for AnyStorage {
    fn from(value: MemoryStore) -> Self {
        AnyStorage::Memory(value)
    }
}
