//! SQLite-backed document store
//!
//! One `documents` table keyed by `(collection, id)` holds each record as JSON
//! text with RFC 3339 timestamps; named counters live in `sequences` and
//! unique keys with their owning record in `claims`.

use super::{merge, Document, DocumentStore, StoreError, StoreResult, StoredDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    )",
    "CREATE TABLE IF NOT EXISTS sequences (
        name TEXT PRIMARY KEY,
        value INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS claims (
        scope TEXT NOT NULL,
        key TEXT NOT NULL,
        owner TEXT NOT NULL,
        PRIMARY KEY (scope, key)
    )",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and ensure the schema
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.init_schema().await?;
        info!(url, "SQLite document store ready");
        Ok(store)
    }

    /// Private in-memory database on a single connection
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn parse_timestamp(collection: &str, id: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            message: format!("timestamp {raw:?}: {e}"),
        })
}

fn row_to_document(collection: &str, row: &SqliteRow) -> StoreResult<StoredDocument> {
    let id: String = row.try_get("id")?;
    let data: String = row.try_get("data")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let data: Document = serde_json::from_str(&data).map_err(|e| StoreError::Corrupt {
        collection: collection.to_string(),
        id: id.clone(),
        message: e.to_string(),
    })?;

    Ok(StoredDocument {
        created_at: parse_timestamp(collection, &id, &created_at)?,
        updated_at: parse_timestamp(collection, &id, &updated_at)?,
        id,
        data,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>> {
        let rows = sqlx::query(
            "SELECT id, data, created_at, updated_at FROM documents WHERE collection = ?",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row_to_document(collection, row)).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredDocument>> {
        let row = sqlx::query(
            "SELECT id, data, created_at, updated_at FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_document(collection, &row)).transpose()
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> StoreResult<StoredDocument> {
        let now = Utc::now();
        let json = serde_json::to_string(&data)?;

        let result = sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (collection, id) DO NOTHING",
        )
        .bind(collection)
        .bind(id)
        .bind(&json)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        Ok(StoredDocument {
            id: id.to_string(),
            data,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> StoreResult<StoredDocument> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, data, created_at, updated_at FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };

        let mut doc = row_to_document(collection, &row)?;
        merge(&mut doc.data, patch);
        doc.updated_at = Utc::now();

        sqlx::query(
            "UPDATE documents SET data = ?, updated_at = ? WHERE collection = ? AND id = ?",
        )
        .bind(serde_json::to_string(&doc.data)?)
        .bind(doc.updated_at.to_rfc3339())
        .bind(collection)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(doc)
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn next_sequence(&self, name: &str) -> StoreResult<u64> {
        let row = sqlx::query(
            "INSERT INTO sequences (name, value) VALUES (?, 1)
             ON CONFLICT (name) DO UPDATE SET value = value + 1
             RETURNING value",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        let value: i64 = row.try_get("value")?;
        Ok(value as u64)
    }

    async fn claim(&self, scope: &str, key: &str, owner: &str) -> StoreResult<bool> {
        // On conflict the no-op update makes RETURNING yield the current holder
        let row = sqlx::query(
            "INSERT INTO claims (scope, key, owner) VALUES (?, ?, ?)
             ON CONFLICT (scope, key) DO UPDATE SET owner = claims.owner
             RETURNING owner",
        )
        .bind(scope)
        .bind(key)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let holder: String = row.try_get("owner")?;
        Ok(holder == owner)
    }

    async fn release(&self, scope: &str, key: &str, owner: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM claims WHERE scope = ? AND key = ? AND owner = ?")
            .bind(scope)
            .bind(key)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
