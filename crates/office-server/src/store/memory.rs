//! In-process store used when no database is configured

use super::{merge, Document, DocumentStore, StoreError, StoreResult, StoredDocument};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Keeps every collection in memory; contents are lost on exit
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, StoredDocument>>>,
    sequences: RwLock<HashMap<String, u64>>,
    /// `(scope, key)` to owner
    claims: RwLock<HashMap<(String, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredDocument>> {
        let collections = self.collections.read();
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> StoreResult<StoredDocument> {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let now = Utc::now();
        let doc = StoredDocument {
            id: id.to_string(),
            data,
            created_at: now,
            updated_at: now,
        };
        docs.insert(id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> StoreResult<StoredDocument> {
        let mut collections = self.collections.write();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        merge(&mut doc.data, patch);
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write();
        Ok(collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }

    async fn next_sequence(&self, name: &str) -> StoreResult<u64> {
        let mut sequences = self.sequences.write();
        let value = sequences.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn claim(&self, scope: &str, key: &str, owner: &str) -> StoreResult<bool> {
        let mut claims = self.claims.write();
        let holder = claims
            .entry((scope.to_string(), key.to_string()))
            .or_insert_with(|| owner.to_string());
        Ok(holder == owner)
    }

    async fn release(&self, scope: &str, key: &str, owner: &str) -> StoreResult<()> {
        let mut claims = self.claims.write();
        let claim = (scope.to_string(), key.to_string());
        if claims.get(&claim).is_some_and(|holder| holder == owner) {
            claims.remove(&claim);
        }
        Ok(())
    }
}
