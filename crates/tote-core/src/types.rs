//! # Domain Types
//!
//! Core domain types shared by every slice.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Rating      │   │   Credentials   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (ProductId) │   │  rate (0-5)     │   │  username       │       │
//! │  │  title          │   │  count          │   │  password       │       │
//! │  │  price (Money)  │   └─────────────────┘   │  (validated)    │       │
//! │  │  image, category│                         └─────────────────┘       │
//! │  │  description    │   ┌─────────────────┐                             │
//! │  │  rating         │   │      User       │                             │
//! │  └─────────────────┘   │  username       │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation;

// =============================================================================
// Product Identity
// =============================================================================

/// Catalog identifier of a product. Cart lines are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        ProductId(id)
    }
}

// =============================================================================
// Rating
// =============================================================================

/// Customer rating summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rating {
    /// Average rate, always within 0.0..=5.0.
    pub rate: f64,
    /// Number of ratings.
    pub count: u32,
}

impl Rating {
    /// Highest possible rate.
    pub const MAX_RATE: f64 = 5.0;

    /// Creates a rating, clamping the rate into `0.0..=5.0`.
    /// A non-finite rate becomes 0.
    pub fn new(rate: f64, count: u32) -> Self {
        let rate = if rate.is_finite() {
            rate.clamp(0.0, Self::MAX_RATE)
        } else {
            0.0
        };
        Rating { rate, count }
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating { rate: 0.0, count: 0 }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product from the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,

    /// Display name.
    pub title: String,

    /// Unit price. Never negative.
    pub price: Money,

    /// Image URI.
    pub image: String,

    /// Catalog category, e.g. "electronics".
    pub category: String,

    /// Long description for the detail screen.
    pub description: String,

    /// Customer rating.
    #[serde(default)]
    pub rating: Rating,
}

impl Product {
    /// Short title for notices such as "Fjallraven - Foldsack No... added to cart!".
    pub fn short_title(&self, max_chars: usize) -> String {
        if self.title.chars().count() <= max_chars {
            return self.title.clone();
        }
        let truncated: String = self.title.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

// =============================================================================
// User & Credentials
// =============================================================================

/// The signed-in user. Only the username is known client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub username: String,
}

/// Login credentials that already passed validation.
///
/// The only constructor validates, so an empty username can never reach the
/// auth slice.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Validates and wraps a username/password pair.
    ///
    /// ```rust
    /// use tote_core::Credentials;
    ///
    /// assert!(Credentials::new("johnd", "m38rmF$").is_ok());
    /// assert!(Credentials::new("", "m38rmF$").is_err());
    /// ```
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let username = username.into();
        let password = password.into();
        validation::validate_credentials(&username, &password)?;
        Ok(Credentials { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
