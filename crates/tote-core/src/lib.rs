//! # tote-core: Pure State Logic for Tote
//!
//! Domain types and the three state slices of the storefront client. Nothing
//! in this crate performs I/O: the store crate drives it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tote Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Screens (mobile UI)                          │   │
//! │  │    Login ──► Product List ──► Product Detail ──► Cart          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ subscribe / dispatch                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              tote-store (Store, persistence, config)            │   │
//! │  └──────────┬──────────────────┬──────────────────────┬────────────┘   │
//! │             │                  │                      │                 │
//! │  ┌──────────▼────────┐  ┌──────▼────────┐  ┌──────────▼────────┐       │
//! │  │ ★ tote-core ★     │  │   tote-api    │  │     tote-db       │       │
//! │  │ slices, money     │  │   HTTP client │  │   key-value store │       │
//! │  │ NO I/O            │  └───────────────┘  └───────────────────┘       │
//! │  └───────────────────┘                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Rating, User, Credentials
//! - [`money`] - Money type with integer arithmetic
//! - [`request`] - request status, errors, sequence numbers
//! - [`slices`] - auth, catalog and cart reducers
//! - [`state`] - the combined state tree
//! - [`validation`] - credential checks
//! - [`error`] - domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tote_core::{CartAction, CartState, Money, Product, ProductId, Rating};
//!
//! let mug = Product {
//!     id: ProductId(1),
//!     title: "Mug".to_string(),
//!     price: Money::from_cents(1000),
//!     image: String::new(),
//!     category: "kitchen".to_string(),
//!     description: String::new(),
//!     rating: Rating::default(),
//! };
//!
//! let mut cart = CartState::new();
//! cart.reduce(CartAction::Add(mug.clone()));
//! cart.reduce(CartAction::Add(mug));
//! assert_eq!(cart.total_amount().to_decimal_string(), "20.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod request;
pub mod slices;
pub mod state;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use request::{
    ErrorKind, Operation, Outcome, RequestError, RequestSeq, RequestStatus, StaleResponsePolicy,
};
pub use slices::*;
pub use state::{Action, AppState};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single cart line.
///
/// Larger requested quantities are clamped, not rejected.
pub const MAX_ITEM_QUANTITY: i64 = 999;
