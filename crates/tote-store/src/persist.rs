//! # Snapshot Persistence
//!
//! Versioned snapshot envelopes and the background writer that pushes them
//! to storage.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Store::dispatch (lock held)                                           │
//! │       │  projection changed?                                            │
//! │       ▼                                                                 │
//! │  encode(Envelope { version, saved_at, state })                         │
//! │       │                                                                 │
//! │       ▼  unbounded mpsc (never blocks the caller)                      │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  writer task                                                    │   │
//! │  │  1. wait for a command                                          │   │
//! │  │  2. drain everything already queued                             │   │
//! │  │  3. keep the LAST command per key                               │   │
//! │  │  4. apply to KeyValueStorage (failures logged, not retried)     │   │
//! │  │  5. answer every Flush seen in this batch                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Versioning
//! A snapshot newer than [`SNAPSHOT_VERSION`] is discarded. An older one is
//! upgraded one version at a time through [`MIGRATIONS`]; if a step is
//! missing the snapshot is discarded.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use tote_db::KeyValueStorage;

use crate::error::{StoreError, StoreResult};

/// Current snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Upgrade step from version `from` to `from + 1`. Returns `None` when the
/// old state can't be carried over.
pub type Migration = fn(serde_json::Value) -> Option<serde_json::Value>;

/// Known upgrade steps, keyed by source version.
pub const MIGRATIONS: &[(u32, Migration)] = &[];

// =============================================================================
// Keys
// =============================================================================

/// The slices that survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistedSlice {
    Auth,
    Cart,
}

impl PersistedSlice {
    pub const ALL: [PersistedSlice; 2] = [PersistedSlice::Auth, PersistedSlice::Cart];

    pub fn name(&self) -> &'static str {
        match self {
            PersistedSlice::Auth => "auth",
            PersistedSlice::Cart => "cart",
        }
    }

    /// `<prefix>:<slice>`, e.g. `persist:cart`.
    pub fn key(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self.name())
    }
}

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    saved_at: DateTime<Utc>,
    state: T,
}

/// Wraps a slice projection in the current envelope.
pub fn encode<T: Serialize>(state: &T) -> StoreResult<String> {
    let envelope = Envelope {
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        state,
    };
    serde_json::to_string(&envelope).map_err(|e| StoreError::SnapshotEncode(e.to_string()))
}

/// Unwraps and, if needed, migrates a stored snapshot.
pub fn decode<T: DeserializeOwned>(key: &str, blob: &str) -> StoreResult<T> {
    let decode_err = |message: String| StoreError::SnapshotDecode {
        key: key.to_string(),
        message,
    };

    let envelope: Envelope<serde_json::Value> =
        serde_json::from_str(blob).map_err(|e| decode_err(e.to_string()))?;

    let state = migrate(key, envelope.version, envelope.state)?;
    serde_json::from_value(state).map_err(|e| decode_err(e.to_string()))
}

fn migrate(key: &str, version: u32, mut state: serde_json::Value) -> StoreResult<serde_json::Value> {
    let unsupported = || StoreError::UnsupportedVersion {
        key: key.to_string(),
        version,
    };

    if version > SNAPSHOT_VERSION {
        return Err(unsupported());
    }

    for from in version..SNAPSHOT_VERSION {
        let step = MIGRATIONS
            .iter()
            .find(|(v, _)| *v == from)
            .map(|(_, f)| *f)
            .ok_or_else(unsupported)?;
        state = step(state).ok_or_else(unsupported)?;
        debug!(key = %key, from, to = from + 1, "Migrated snapshot");
    }

    Ok(state)
}

// =============================================================================
// Writer Task
// =============================================================================

#[derive(Debug)]
enum WriteCommand {
    Set { key: String, blob: String },
    Remove { key: String },
    Flush(oneshot::Sender<()>),
}

/// Handle to the background writer. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PersistWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl PersistWriter {
    /// Spawns the writer on `runtime`. The task ends when every handle is
    /// dropped and the queue is drained.
    pub fn spawn(
        storage: Arc<dyn KeyValueStorage>,
        runtime: &tokio::runtime::Handle,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = runtime.spawn(run_writer(storage, rx));
        (PersistWriter { tx }, handle)
    }

    /// Queues a write. Never blocks.
    pub fn set(&self, key: String, blob: String) {
        if self.tx.send(WriteCommand::Set { key, blob }).is_err() {
            error!("Snapshot writer has stopped; write dropped");
        }
    }

    /// Queues a delete.
    pub fn remove(&self, key: String) {
        if self.tx.send(WriteCommand::Remove { key }).is_err() {
            error!("Snapshot writer has stopped; delete dropped");
        }
    }

    /// Resolves once every command queued before this call was applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteCommand::Flush(done_tx)).is_err() {
            return;
        }
        // A dropped sender means the task is gone; nothing left to wait for.
        let _ = done_rx.await;
    }
}

async fn run_writer(
    storage: Arc<dyn KeyValueStorage>,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
) {
    info!("Snapshot writer started");

    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        // Last write wins per key; first-seen key order is kept.
        let mut latest: Vec<(String, Option<String>)> = Vec::new();
        let mut waiters = Vec::new();
        for command in batch {
            let (key, value) = match command {
                WriteCommand::Set { key, blob } => (key, Some(blob)),
                WriteCommand::Remove { key } => (key, None),
                WriteCommand::Flush(done) => {
                    waiters.push(done);
                    continue;
                }
            };
            match latest.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => latest.push((key, value)),
            }
        }

        for (key, value) in latest {
            let result = match &value {
                Some(blob) => storage.set(&key, blob).await,
                None => storage.remove(&key).await,
            };
            match result {
                Ok(()) => debug!(key = %key, removed = value.is_none(), "Snapshot written"),
                Err(e) => error!(key = %key, error = %e, "Snapshot write failed; state kept in memory only"),
            }
        }

        for done in waiters {
            let _ = done.send(());
        }
    }

    info!("Snapshot writer stopped");
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tote_core::{CartSnapshot, SessionSnapshot, User};
    use tote_db::MemoryStorage;

    #[test]
    fn test_keys() {
        assert_eq!(PersistedSlice::Auth.key("persist"), "persist:auth");
        assert_eq!(PersistedSlice::Cart.key("qa"), "qa:cart");
    }

    #[test]
    fn test_encode_decode() {
        let session = SessionSnapshot {
            token: Some("T".to_string()),
            user: Some(User {
                username: "johnd".to_string(),
            }),
            is_authenticated: true,
        };
        let blob = encode(&session).unwrap();
        assert!(blob.contains(r#""version":1"#));

        let decoded: SessionSnapshot = decode("persist:auth", &blob).unwrap();
        assert_eq!(decoded, session);
    }

    #[test]
    fn test_newer_version_rejected() {
        let blob = r#"{"version":99,"saved_at":"2026-01-01T00:00:00Z","state":{}}"#;
        let err = decode::<CartSnapshot>("persist:cart", blob).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { version: 99, .. }));
    }

    #[test]
    fn test_older_version_without_migration_rejected() {
        let blob = r#"{"version":0,"saved_at":"2026-01-01T00:00:00Z","state":{}}"#;
        let err = decode::<CartSnapshot>("persist:cart", blob).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { version: 0, .. }));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = decode::<CartSnapshot>("persist:cart", "not json").unwrap_err();
        assert!(matches!(err, StoreError::SnapshotDecode { .. }));

        let wrong_shape = r#"{"version":1,"saved_at":"2026-01-01T00:00:00Z","state":{"line_items":7}}"#;
        assert!(decode::<CartSnapshot>("persist:cart", wrong_shape).is_err());
    }

    #[tokio::test]
    async fn test_writer_last_write_wins_and_flush() {
        let storage = MemoryStorage::new();
        let (writer, _task) =
            PersistWriter::spawn(Arc::new(storage.clone()), &tokio::runtime::Handle::current());

        writer.set("persist:cart".into(), "1".into());
        writer.set("persist:cart".into(), "2".into());
        writer.set("persist:auth".into(), "a".into());
        writer.remove("persist:auth".into());
        writer.flush().await;

        assert_eq!(storage.get("persist:cart").await.unwrap().as_deref(), Some("2"));
        assert_eq!(storage.get("persist:auth").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writer_stops_when_handles_dropped() {
        let (writer, task) = PersistWriter::spawn(
            Arc::new(MemoryStorage::new()),
            &tokio::runtime::Handle::current(),
        );
        drop(writer);
        task.await.unwrap();
    }
}
