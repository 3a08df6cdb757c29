//! # Error Types
//!
//! Domain-specific error types for tote-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tote-core errors (this file)                                          │
//! │  ├── CoreError        - Domain conversion failures                     │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── RequestError     - What a slice stores in `last_error`            │
//! │      (see `request.rs`)                                                 │
//! │                                                                         │
//! │  tote-db errors     → DbError     (logged, never shown to the user)    │
//! │  tote-api errors    → ApiError    → RequestError                       │
//! │  tote-store errors  → StoreError  (config, snapshot codec)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A monetary amount could not be represented in cents.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A price was negative.
    ///
    /// ## When This Occurs
    /// The catalog sent a product whose price is below zero. The product is
    /// rejected at the wire boundary instead of poisoning cart totals.
    #[error("Product {product_id} has a negative price: {price}")]
    NegativePrice { product_id: String, price: String },

    /// A price was above [`Money::MAX_UNIT_PRICE`](crate::Money::MAX_UNIT_PRICE).
    #[error("Product {product_id} has an out-of-range price: {price}")]
    PriceOutOfRange { product_id: String, price: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before anything is dispatched to the store, e.g. an empty username
/// on the login form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
