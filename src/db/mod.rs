//! Key-value document store.
//!
//! Async SQLite access through SQLx, exposed to the rest of the core as a
//! narrow per-module document API: `find_one`, `find_one_and_update`,
//! `delete_one`. One table holds one JSON document per opaque module id;
//! the core's own prefix configuration lives under the id `"core"`.

use crate::error::DbError;
use serde_json::{Map, Value};
use sqlx::Row;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS module_docs (
    module_id TEXT PRIMARY KEY,
    doc TEXT NOT NULL
)";

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open (and initialize) the store at `uri`.
    pub async fn connect(uri: &str) -> Result<Self, DbError> {
        let pool = if uri == ":memory:" {
            // Use a uniquely named shared-cache memory database per call.
            // `file::memory:` is global-ish and will collide across
            // parallel tests.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:umbra-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(uri).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(uri)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .connect_with(options)
                .await?
        };

        sqlx::query(SCHEMA).execute(&pool).await?;
        info!(uri = %uri, "document store ready");
        Ok(Self { pool })
    }

    /// Document access scoped to one module id.
    pub fn collection(&self, module_id: impl Into<String>) -> ModuleStore {
        ModuleStore {
            pool: self.pool.clone(),
            module_id: module_id.into(),
        }
    }
}

/// Narrow document API for one module id.
#[derive(Clone)]
pub struct ModuleStore {
    pool: SqlitePool,
    module_id: String,
}

impl ModuleStore {
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Fetch the module's document, if any.
    pub async fn find_one(&self) -> Result<Option<Value>, DbError> {
        let row = sqlx::query("SELECT doc FROM module_docs WHERE module_id = ?")
            .bind(&self.module_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let raw: String = row.get("doc");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    /// Merge `patch`'s top-level keys into the document ("$set"
    /// semantics). With `upsert`, a missing document is created from the
    /// patch; otherwise `None` is returned and nothing is written.
    /// Returns the resulting document.
    pub async fn find_one_and_update(
        &self,
        patch: Value,
        upsert: bool,
    ) -> Result<Option<Value>, DbError> {
        let mut tx = self.pool.begin().await?;
        let existing: Option<String> =
            sqlx::query_scalar("SELECT doc FROM module_docs WHERE module_id = ?")
                .bind(&self.module_id)
                .fetch_optional(&mut *tx)
                .await?;

        let doc = match existing {
            Some(raw) => {
                let mut doc: Value = serde_json::from_str(&raw)?;
                merge_into(&mut doc, patch);
                doc
            }
            None if upsert => as_object(patch),
            None => return Ok(None),
        };

        sqlx::query(
            "INSERT INTO module_docs (module_id, doc) VALUES (?, ?)
             ON CONFLICT(module_id) DO UPDATE SET doc = excluded.doc",
        )
        .bind(&self.module_id)
        .bind(doc.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(doc))
    }

    /// Delete the module's document. Returns whether one existed.
    pub async fn delete_one(&self) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM module_docs WHERE module_id = ?")
            .bind(&self.module_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn as_object(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Value::Object(map)
        }
    }
}

fn merge_into(doc: &mut Value, patch: Value) {
    let Value::Object(patch) = patch else {
        *doc = patch;
        return;
    };
    if !doc.is_object() {
        *doc = Value::Object(Map::new());
    }
    let target = doc.as_object_mut().expect("doc coerced to object above");
    for (key, value) in patch {
        target.insert(key, value);
    }
}
