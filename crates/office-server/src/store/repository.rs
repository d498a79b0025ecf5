//! Typed repository shared by every record kind

use super::{Document, DocumentStore, StoreError, StoreResult, StoredDocument};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Field names the repository stamps itself
pub const CREATED_AT: &str = "作成日時";
pub const UPDATED_AT: &str = "更新日時";
pub const ID: &str = "id";

/// What `delete` does to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Physically remove the document
    Hard,
    /// Set `field` to `value` and keep the document
    Soft {
        field: &'static str,
        value: &'static str,
    },
}

/// A record kind persisted in its own collection
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Field listed newest-first
    const ORDER_FIELD: &'static str;
    const DELETE: DeletePolicy;
}

/// CRUD over one collection, converting between documents and `E`
pub struct Repository<E> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Every record, newest first by the entity's order field
    pub async fn list(&self) -> StoreResult<Vec<E>> {
        let docs = self.store.list(E::COLLECTION).await.map_err(log_failure::<E>("list"))?;

        let mut docs: Vec<Document> = docs.into_iter().map(flatten).collect();
        docs.sort_by(|a, b| newest_first(a, b, E::ORDER_FIELD));
        docs.into_iter().map(decode::<E>).collect()
    }

    pub async fn get(&self, id: &str) -> StoreResult<E> {
        let doc = self
            .store
            .get(E::COLLECTION, id)
            .await
            .map_err(log_failure::<E>("get"))?
            .ok_or_else(|| not_found::<E>(id))?;
        decode(flatten(doc))
    }

    /// A fresh record id
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Store a new record under a fresh UUID
    pub async fn create(&self, fields: Document) -> StoreResult<E> {
        self.create_with_id(&Self::new_id(), fields).await
    }

    /// Store a new record under an id chosen beforehand with [`Self::new_id`]
    pub async fn create_with_id(&self, id: &str, fields: Document) -> StoreResult<E> {
        let doc = self
            .store
            .insert(E::COLLECTION, id, strip_managed(fields))
            .await
            .map_err(log_failure::<E>("create"))?;
        debug!(collection = E::COLLECTION, id, "record created");
        decode(flatten(doc))
    }

    /// Merge `fields` into an existing record
    pub async fn update(&self, id: &str, fields: Document) -> StoreResult<E> {
        let doc = self
            .store
            .update(E::COLLECTION, id, strip_managed(fields))
            .await
            .map_err(log_failure::<E>("update"))?;
        decode(flatten(doc))
    }

    /// Delete according to the entity's policy
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        match E::DELETE {
            DeletePolicy::Hard => {
                let removed = self
                    .store
                    .remove(E::COLLECTION, id)
                    .await
                    .map_err(log_failure::<E>("delete"))?;
                if !removed {
                    return Err(not_found::<E>(id));
                }
            }
            DeletePolicy::Soft { field, value } => {
                let mut patch = Document::new();
                patch.insert(field.to_string(), Value::String(value.to_string()));
                self.store
                    .update(E::COLLECTION, id, patch)
                    .await
                    .map_err(log_failure::<E>("delete"))?;
            }
        }
        debug!(collection = E::COLLECTION, id, "record deleted");
        Ok(())
    }

    /// Next value of a named counter
    pub async fn next_sequence(&self, name: &str) -> StoreResult<u64> {
        self.store
            .next_sequence(name)
            .await
            .map_err(log_failure::<E>("next_sequence"))
    }

    /// Take a unique `key` within `scope` for record `id`
    pub async fn claim(&self, scope: &str, key: &str, id: &str) -> StoreResult<bool> {
        self.store
            .claim(scope, key, id)
            .await
            .map_err(log_failure::<E>("claim"))
    }

    pub async fn release(&self, scope: &str, key: &str, id: &str) -> StoreResult<()> {
        self.store
            .release(scope, key, id)
            .await
            .map_err(log_failure::<E>("release"))
    }
}

fn not_found<E: Entity>(id: &str) -> StoreError {
    StoreError::NotFound {
        collection: E::COLLECTION.to_string(),
        id: id.to_string(),
    }
}

/// Log store failures with their collection before they propagate
fn log_failure<E: Entity>(operation: &'static str) -> impl Fn(StoreError) -> StoreError {
    move |err| {
        if !matches!(err, StoreError::NotFound { .. }) {
            error!(collection = E::COLLECTION, operation, error = %err, "store operation failed");
        }
        err
    }
}

/// Drop fields callers may not set
fn strip_managed(mut fields: Document) -> Document {
    fields.remove(ID);
    fields.remove(CREATED_AT);
    fields.remove(UPDATED_AT);
    fields
}

/// Record fields plus id and store timestamps in one object
fn flatten(doc: StoredDocument) -> Document {
    let mut data = doc.data;
    data.insert(ID.to_string(), Value::String(doc.id));
    data.insert(CREATED_AT.to_string(), Value::String(doc.created_at.to_rfc3339()));
    data.insert(UPDATED_AT.to_string(), Value::String(doc.updated_at.to_rfc3339()));
    data
}

fn decode<E: Entity>(data: Document) -> StoreResult<E> {
    let id = data
        .get(ID)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    serde_json::from_value(Value::Object(data)).map_err(|e| StoreError::Corrupt {
        collection: E::COLLECTION.to_string(),
        id,
        message: e.to_string(),
    })
}

/// Order by `field` descending, ties by creation time descending
///
/// Dates and timestamps are stored as ISO 8601 strings, so comparing the text
/// orders them chronologically. Records missing the field sort last.
fn newest_first(a: &Document, b: &Document, field: &str) -> Ordering {
    let key = |doc: &Document, name: &str| doc.get(name).and_then(Value::as_str).map(str::to_owned);
    match (key(a, field), key(b, field)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| key(b, CREATED_AT).cmp(&key(a, CREATED_AT)))
}
