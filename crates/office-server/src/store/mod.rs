//! Document store
//!
//! Records are persisted as JSON objects grouped into named collections. The
//! store knows nothing about record types; [`Repository`] adds the typed layer
//! on top of any [`DocumentStore`] backend.

mod memory;
mod repository;
mod sqlite;

pub use memory::MemoryStore;
pub use repository::{DeletePolicy, Entity, Repository, CREATED_AT, ID, UPDATED_AT};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level fields of a stored record
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("{collection}/{id} already exists")]
    Duplicate { collection: String, id: String },

    #[error("corrupt document {collection}/{id}: {message}")]
    Corrupt {
        collection: String,
        id: String,
        message: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A record as held by the store, with store-managed timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection, in no particular order
    async fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredDocument>>;

    /// Insert a new document; `id` must not exist yet
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> StoreResult<StoredDocument>;

    /// Merge `patch` into the top-level fields of an existing document
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> StoreResult<StoredDocument>;

    /// Physically delete; `false` when nothing was stored under `id`
    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Next value of a named counter, starting at 1
    async fn next_sequence(&self, name: &str) -> StoreResult<u64>;

    /// Atomically take `key` within `scope` for `owner`
    ///
    /// Returns `false` when another owner already holds the key. Claiming a
    /// key the owner already holds succeeds.
    async fn claim(&self, scope: &str, key: &str, owner: &str) -> StoreResult<bool>;

    /// Give up `key` if `owner` holds it
    async fn release(&self, scope: &str, key: &str, owner: &str) -> StoreResult<()>;
}

/// Top-level key merge; `null` values in the patch are stored as `null`
pub(crate) fn merge(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}
