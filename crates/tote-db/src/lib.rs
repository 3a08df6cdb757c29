//! # tote-db: Persistence Adapter for Tote
//!
//! Key-value storage for persisted state snapshots. The store only ever sees
//! the [`KeyValueStorage`] trait; this crate provides a SQLite implementation
//! for devices and an in-memory one for tests.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tote Persistence                                 │
//! │                                                                         │
//! │  tote-store writer task                                                │
//! │       │  set("persist:cart", "{...}")                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tote-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ KeyValueStorage│   │  Database     │    │  Migrations  │  │   │
//! │  │   │ (storage.rs)   │◄──│  (pool.rs)    │    │  (embedded)  │  │   │
//! │  │   │               │    │ KeyValueRepo  │    │ 001_kv.sql   │  │   │
//! │  │   │ MemoryStorage  │   └───────────────┘    └──────────────┘  │   │
//! │  │   └───────────────┘                                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file in the platform data dir (tote.db)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tote_db::{Database, DbConfig, KeyValueStorage};
//!
//! let db = Database::new(DbConfig::new("tote.db")).await?;
//! db.set("persist:auth", r#"{"version":1}"#).await?;
//! let blob = db.get("persist:auth").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::kv::KeyValueRepository;
pub use storage::{KeyValueStorage, MemoryStorage};
