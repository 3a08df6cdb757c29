//! # Validation Module
//!
//! Input validation for values that cross from the UI into the store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Screen                                                        │
//! │  └── Immediate feedback while typing                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before dispatch)                                 │
//! │  └── Credentials::new → validate_credentials                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Slices                                                        │
//! │  └── Do NOT re-validate: they only accept already-valid types          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tote_core::validation::validate_credentials;
//!
//! assert!(validate_credentials("mor_2314", "83r5^_").is_ok());
//! assert!(validate_credentials("   ", "83r5^_").is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum accepted username length.
pub const MAX_USERNAME_LEN: usize = 100;

/// Maximum accepted password length.
pub const MAX_PASSWORD_LEN: usize = 128;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a field is non-empty after trimming and within `max` chars.
///
/// The original value is NOT trimmed for the caller: the login request sends
/// exactly what the user typed.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a username.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_required("username", username, MAX_USERNAME_LEN)
}

/// Validates a password.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    validate_required("password", password, MAX_PASSWORD_LEN)
}

/// Validates both credentials, reporting the username first.
pub fn validate_credentials(username: &str, password: &str) -> ValidationResult<()> {
    validate_username(username)?;
    validate_password(password)
}

// =============================================================================
// Unit Tests
// =============================================================================
