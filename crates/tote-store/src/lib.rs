//! # tote-store: Store Composer for Tote
//!
//! Owns the single state tree, runs the async request lifecycle against the
//! catalog API and persists the auth and cart slices across restarts.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           tote-store                                    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         Store                                    │  │
//! │  │  dispatch / subscribe / login / fetch_* / cart ops / checkout    │  │
//! │  └──────────┬───────────────────────┬───────────────────┬───────────┘  │
//! │             │                       │                   │              │
//! │             ▼                       ▼                   ▼              │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌─────────────────┐   │
//! │  │ tote-core reducers │  │ PersistWriter      │  │ CatalogApi      │   │
//! │  │ (pure)             │  │ versioned snapshots│  │ (tote-api)      │   │
//! │  └────────────────────┘  │ → KeyValueStorage  │  └─────────────────┘   │
//! │                          └────────────────────┘                        │
//! │                                                                         │
//! │  ToteConfig: defaults → tote.toml → TOTE_* env vars → validate         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tote_api::HttpCatalogClient;
//! use tote_db::MemoryStorage;
//! use tote_store::{Store, StoreOptions, ToteConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ToteConfig::load_or_default(None);
//! let api = Arc::new(HttpCatalogClient::new(config.api_config()?)?);
//! let store = Store::open(api, Arc::new(MemoryStorage::new()), StoreOptions::from(&config)).await?;
//!
//! let products = store.fetch_all_products().await?;
//! if let Some(first) = products.first() {
//!     store.add_to_cart(first.clone());
//! }
//! store.flush().await;
//! # Ok(())
//! # }
//! ```

pub mod checkout;
pub mod config;
pub mod error;
pub mod persist;
pub mod store;

pub use checkout::CheckoutReceipt;
pub use config::{ApiSettings, StorageSettings, StoreSettings, ToteConfig};
pub use error::{StoreError, StoreResult};
pub use persist::{PersistWriter, PersistedSlice, SNAPSHOT_VERSION};
pub use store::{Store, StoreBuilder, StoreOptions};
