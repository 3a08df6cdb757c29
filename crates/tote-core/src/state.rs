//! # Application State
//!
//! The single state tree and the action enum that addresses each slice.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AppState                                        │
//! │                                                                         │
//! │   Action::Auth(..)    ──► auth.reduce()     ──► persisted: session     │
//! │   Action::Catalog(..) ──► catalog.reduce()  ──► memory only            │
//! │   Action::Cart(..)    ──► cart.reduce()     ──► persisted: cart        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::request::{Outcome, StaleResponsePolicy};
use crate::slices::{
    AuthAction, AuthState, CartAction, CartState, CatalogAction, CatalogState,
};

/// An action routed to exactly one slice.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Auth(AuthAction),
    Catalog(CatalogAction),
    Cart(CartAction),
}

impl From<AuthAction> for Action {
    fn from(action: AuthAction) -> Self {
        Action::Auth(action)
    }
}

impl From<CatalogAction> for Action {
    fn from(action: CatalogAction) -> Self {
        Action::Catalog(action)
    }
}

impl From<CartAction> for Action {
    fn from(action: CartAction) -> Self {
        Action::Cart(action)
    }
}

/// The whole client state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppState {
    pub auth: AuthState,
    pub catalog: CatalogState,
    pub cart: CartState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes an action to its slice.
    pub fn reduce(&mut self, action: Action, policy: StaleResponsePolicy) -> Outcome {
        match action {
            Action::Auth(action) => self.auth.reduce(action, policy),
            Action::Catalog(action) => self.catalog.reduce(action, policy),
            Action::Cart(action) => self.cart.reduce(action),
        }
    }
}
