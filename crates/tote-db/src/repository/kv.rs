//! # Key-Value Repository
//!
//! Upserts and lookups on the `kv_store` table.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kv_store                                                               │
//! │  ┌──────────────────┬──────────────────────────────┬─────────────────┐ │
//! │  │ key (PK)         │ value                        │ updated_at      │ │
//! │  ├──────────────────┼──────────────────────────────┼─────────────────┤ │
//! │  │ persist:auth     │ {"version":1,"state":{..}}   │ 2026-10-19T..   │ │
//! │  │ persist:cart     │ {"version":1,"state":{..}}   │ 2026-10-19T..   │ │
//! │  └──────────────────┴──────────────────────────────┴─────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for snapshot blobs.
#[derive(Debug, Clone)]
pub struct KeyValueRepository {
    pool: SqlitePool,
}

impl KeyValueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        KeyValueRepository { pool }
    }

    /// Reads the value stored under `key`.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        debug!(key = %key, found = value.is_some(), "kv get");
        Ok(value)
    }

    /// Inserts or replaces the value under `key`.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(key = %key, bytes = value.len(), "kv set");
        Ok(())
    }

    /// Deletes `key`. Returns whether a row existed.
    pub async fn remove(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        debug!(key = %key, removed = result.rows_affected(), "kv remove");
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
