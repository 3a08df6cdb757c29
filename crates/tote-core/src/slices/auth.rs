//! # Auth Slice
//!
//! Session state driven by the login request lifecycle.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LoginPending        status = Pending, last_error = None, seq += 1     │
//! │  LoginFulfilled(n)   token, user, is_authenticated = true, Idle        │
//! │  LoginRejected(n)    status = Rejected, last_error = Some(..)          │
//! │                      is_authenticated is NOT touched                   │
//! │  Logout              session reset to its initial value                │
//! │  Rehydrate           token / user / is_authenticated from storage      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::request::{Operation, Outcome, RequestError, RequestSeq, RequestStatus, StaleResponsePolicy};
use crate::types::User;

/// Mutations accepted by the auth slice.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    LoginPending,
    LoginFulfilled {
        seq: RequestSeq,
        username: String,
        token: String,
    },
    LoginRejected {
        seq: RequestSeq,
        error: RequestError,
    },
    Logout,
    Rehydrate(SessionSnapshot),
}

/// The persisted projection of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
}

/// Authentication state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub request_status: RequestStatus,
    pub last_error: Option<RequestError>,

    #[serde(skip)]
    #[ts(skip)]
    latest_login: RequestSeq,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the most recently dispatched login.
    pub fn latest_login(&self) -> RequestSeq {
        self.latest_login
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token.clone(),
            user: self.user.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    pub fn reduce(&mut self, action: AuthAction, policy: StaleResponsePolicy) -> Outcome {
        match action {
            AuthAction::LoginPending => {
                self.latest_login = self.latest_login.next();
                self.request_status = RequestStatus::Pending;
                self.last_error = None;
                Outcome::Applied
            }
            AuthAction::LoginFulfilled {
                seq,
                username,
                token,
            } => {
                if let Some(stale) = self.check_stale(seq, policy) {
                    return stale;
                }
                self.token = Some(token);
                self.user = Some(User { username });
                self.is_authenticated = true;
                self.request_status = RequestStatus::Idle;
                self.last_error = None;
                Outcome::Applied
            }
            AuthAction::LoginRejected { seq, error } => {
                if let Some(stale) = self.check_stale(seq, policy) {
                    return stale;
                }
                self.request_status = RequestStatus::Rejected;
                self.last_error = Some(error);
                Outcome::Applied
            }
            AuthAction::Logout => {
                // The counter survives logout so a login resolving afterwards
                // is still recognised.
                let latest_login = self.latest_login;
                *self = AuthState {
                    latest_login,
                    ..AuthState::default()
                };
                Outcome::Applied
            }
            AuthAction::Rehydrate(snapshot) => {
                self.token = snapshot.token;
                self.user = snapshot.user;
                self.is_authenticated = snapshot.is_authenticated;
                Outcome::Applied
            }
        }
    }

    fn check_stale(&self, seq: RequestSeq, policy: StaleResponsePolicy) -> Option<Outcome> {
        if policy.accepts(self.latest_login, seq) {
            None
        } else {
            Some(Outcome::Stale {
                operation: Operation::Login,
                response: seq,
                latest: self.latest_login,
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
