//! # Database Pool Management
//!
//! Opens the SQLite file that holds the persisted snapshots.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new(path)          ← pool settings                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await  ← create dir + file, open pool, migrate  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Arc<dyn KeyValueStorage>     ← handed to Store::open                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL mode is enabled so the writer task never blocks a rehydration read.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::kv::KeyValueRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where and how to open the snapshot database.
///
/// ```rust
/// use tote_db::DbConfig;
///
/// let config = DbConfig::new("/data/tote.db").max_connections(4);
/// assert_eq!(config.max_connections, 4);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Default 2: the writer task plus the rehydration read.
    pub max_connections: u32,

    /// How long a statement waits on a locked file before failing.
    pub busy_timeout: Duration,

    /// How long to wait for a free pooled connection.
    pub acquire_timeout: Duration,

    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 2,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(10),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Throwaway database for tests. One connection only: each connection
    /// to `:memory:` sees its own database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            busy_timeout: Duration::from_secs(1),
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// SQLite-backed snapshot store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening snapshot database");

        let options = if config.is_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        DbError::ConnectionFailed(format!("{}: {e}", parent.display()))
                    })?;
                }
            }
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        }
        .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        info!(max_connections = config.max_connections, "Snapshot database ready");
        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn kv(&self) -> KeyValueRepository {
        KeyValueRepository::new(self.pool.clone())
    }

    /// Closes the pool. Later operations fail with [`DbError::Unavailable`].
    pub async fn close(&self) {
        info!("Closing snapshot database");
        self.pool.close().await;
    }
}
