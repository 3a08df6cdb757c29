//! # Request Lifecycle
//!
//! Types shared by every network-backed slice: the status flag, the closed
//! error enumeration stored in `last_error`, and the sequence numbers used to
//! recognise stale responses.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Idle ──── dispatch (seq = n) ────► Pending                           │
//! │    ▲                                   │                                │
//! │    │                  ┌────────────────┴───────────────┐                │
//! │    │                  ▼                                ▼                │
//! │    └─────────── Fulfilled(n)                     Rejected(n)           │
//! │                                                  status = Rejected      │
//! │                                                  last_error = Some(..)  │
//! │                                                                         │
//! │   A response tagged with seq < latest dispatched is STALE.             │
//! │   What happens to it is decided by StaleResponsePolicy.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Request Status
// =============================================================================

/// Status flag of a network-backed slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RequestStatus {
    /// Nothing in flight. Also the state after a fulfilled request.
    #[default]
    Idle,
    /// A request was dispatched and has not resolved yet.
    Pending,
    /// The most recent accepted response was a failure.
    Rejected,
}

impl RequestStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// Closed set of failure kinds a slice can record.
///
/// `Timeout`, `Unreachable`, `HttpStatus`, `NotFound`, `Unauthorized` and
/// `Decode` are network errors; `Validation` covers input rejected before a
/// request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "status", rename_all = "snake_case")]
#[ts(export)]
pub enum ErrorKind {
    /// The request did not complete within the configured interval.
    Timeout,
    /// The service could not be reached (DNS, refused, TLS...).
    Unreachable,
    /// The service answered with a non-2xx status not covered below.
    HttpStatus(u16),
    /// The requested resource does not exist.
    NotFound,
    /// Credentials were refused.
    Unauthorized,
    /// The response body could not be understood.
    Decode,
    /// Input was rejected before any request was made.
    Validation,
}

impl ErrorKind {
    /// Returns true for every kind produced by the network layer.
    pub fn is_network(&self) -> bool {
        !matches!(self, ErrorKind::Validation)
    }
}

// =============================================================================
// Request Error
// =============================================================================

/// Failure recorded in a slice's `last_error`.
///
/// The message is human-readable and never empty; the kind lets a screen pick
/// the right retry affordance without parsing text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RequestError {
    /// Creates an error, substituting a generic message for an empty one.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            default_message(kind)
        } else {
            message
        };
        RequestError { kind, message }
    }

    /// Timeout after `secs` seconds.
    pub fn timeout(secs: u64) -> Self {
        RequestError::new(
            ErrorKind::Timeout,
            format!("Request timed out after {secs} seconds"),
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Timeout | ErrorKind::Unreachable | ErrorKind::HttpStatus(500..=599)
        )
    }
}

fn default_message(kind: ErrorKind) -> String {
    match kind {
        ErrorKind::Timeout => "Request timed out".to_string(),
        ErrorKind::Unreachable => "Service unreachable".to_string(),
        ErrorKind::HttpStatus(code) => format!("Request failed with status {code}"),
        ErrorKind::NotFound => "Not found".to_string(),
        ErrorKind::Unauthorized => "Login failed".to_string(),
        ErrorKind::Decode => "Unexpected response from server".to_string(),
        ErrorKind::Validation => "Invalid input".to_string(),
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RequestError {}

impl From<crate::error::ValidationError> for RequestError {
    fn from(err: crate::error::ValidationError) -> Self {
        RequestError::new(ErrorKind::Validation, err.to_string())
    }
}

// =============================================================================
// Operations & Sequence Numbers
// =============================================================================

/// The async operations the store orchestrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    FetchAllProducts,
    FetchProductById,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Login => write!(f, "auth/login"),
            Operation::FetchAllProducts => write!(f, "products/fetch_all"),
            Operation::FetchProductById => write!(f, "products/fetch_by_id"),
        }
    }
}

/// Monotonic per-operation request number. `RequestSeq::default()` means
/// "nothing dispatched yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestSeq(u64);

impl RequestSeq {
    #[inline]
    pub const fn new(value: u64) -> Self {
        RequestSeq(value)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The number handed to the next dispatch of the same operation.
    #[inline]
    pub const fn next(&self) -> Self {
        RequestSeq(self.0 + 1)
    }
}

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What to do with a response that resolves after a newer request of the
/// same operation was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleResponsePolicy {
    /// Only the latest dispatched request may change state; older responses
    /// are dropped.
    #[default]
    LatestDispatchedWins,
    /// Every response is applied in the order it resolves. This reproduces
    /// the behaviour of the first mobile release, where a slow stale
    /// response could overwrite a newer one.
    LastResolvedWins,
}

impl StaleResponsePolicy {
    /// Whether a response tagged `response` may be applied when `latest` is
    /// the newest dispatched request of the same operation.
    pub fn accepts(&self, latest: RequestSeq, response: RequestSeq) -> bool {
        match self {
            StaleResponsePolicy::LatestDispatchedWins => response == latest,
            StaleResponsePolicy::LastResolvedWins => true,
        }
    }
}

// =============================================================================
// Reducer Outcome
// =============================================================================

/// What a reducer did with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed.
    Applied,
    /// The action was valid but had nothing to change (e.g. removing an
    /// absent cart line).
    NoOp,
    /// A response for an older request was dropped.
    Stale {
        operation: Operation,
        response: RequestSeq,
        latest: RequestSeq,
    },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Outcome::Stale { .. })
    }

    pub(crate) fn changed(changed: bool) -> Self {
        if changed {
            Outcome::Applied
        } else {
            Outcome::NoOp
        }
    }
}

impl std::str::FromStr for StaleResponsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest_dispatched_wins" | "latest" => Ok(StaleResponsePolicy::LatestDispatchedWins),
            "last_resolved_wins" | "last_resolved" => Ok(StaleResponsePolicy::LastResolvedWins),
            other => Err(format!(
                "Unknown stale response policy: '{other}'. Valid options: latest_dispatched_wins, last_resolved_wins"
            )),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
