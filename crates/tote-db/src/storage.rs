//! # Key-Value Storage
//!
//! The persistence interface the store writes snapshots through.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KeyValueStorage                                      │
//! │                                                                         │
//! │      get(key) -> Option<String>                                        │
//! │      set(key, blob)                                                    │
//! │      remove(key)                                                       │
//! │                                                                         │
//! │   ┌─────────────────────┐          ┌─────────────────────┐             │
//! │   │      Database       │          │    MemoryStorage    │             │
//! │   │  SQLite, survives   │          │  HashMap, lost on   │             │
//! │   │  restarts           │          │  drop (tests, CI)   │             │
//! │   └─────────────────────┘          └─────────────────────┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::DbResult;
use crate::pool::Database;

/// Asynchronous string key-value store.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Reads the blob under `key`, `None` if absent.
    async fn get(&self, key: &str) -> DbResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> DbResult<()>;

    /// Deletes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> DbResult<()>;
}

#[async_trait]
impl KeyValueStorage for Database {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        self.kv().get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.kv().set(key, value).await
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        self.kv().remove(key).await.map(|_| ())
    }
}

#[async_trait]
impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Arc<T> {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        (**self).remove(key).await
    }
}

// =============================================================================
// In-Memory Storage
// =============================================================================

/// Process-local storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;

    async fn exercise(storage: &dyn KeyValueStorage) {
        assert_eq!(storage.get("k").await.unwrap(), None);
        storage.set("k", "v1").await.unwrap();
        storage.set("k", "v2").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v2"));
        storage.remove("k").await.unwrap();
        storage.remove("k").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_storage_contract() {
        let storage = MemoryStorage::new();
        exercise(&storage).await;
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_database_storage_contract() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        exercise(&db).await;
    }

    #[tokio::test]
    async fn test_memory_clones_share_entries() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.set("persist:cart", "{}").await.unwrap();
        assert_eq!(b.len().await, 1);
    }

    #[tokio::test]
    async fn test_arc_dyn_storage() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        exercise(&storage).await;
    }
}
