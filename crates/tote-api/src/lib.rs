//! # tote-api: Remote Catalog Client
//!
//! The [`CatalogApi`] trait is the only way the store talks to the remote
//! service. [`HttpCatalogClient`] implements it with `reqwest`.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reqwest::Error / status / body                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (this crate)   Timeout, Unreachable, Status, NotFound,       │
//! │       │                  Unauthorized, Decode                           │
//! │       ▼                                                                 │
//! │  RequestError (tote-core) stored in the slice's last_error             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tote_api::{ApiConfig, CatalogApi, HttpCatalogClient, DEFAULT_BASE_URL};
//!
//! let client = HttpCatalogClient::new(ApiConfig::new(DEFAULT_BASE_URL)?)?;
//! let products = client.fetch_products().await?;
//! ```

pub mod client;
pub mod dto;
pub mod error;

pub use client::{ApiConfig, CatalogApi, HttpCatalogClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::{ApiError, ApiResult};
