//! # Slices
//!
//! Independent state slices. Each owns its sub-state and a pure `reduce`
//! method; none of them perform I/O.
//!
//! - [`auth`] - session and login lifecycle (persisted)
//! - [`catalog`] - product list and detail (never persisted)
//! - [`cart`] - line items and derived totals (persisted)

pub mod auth;
pub mod cart;
pub mod catalog;

pub use auth::{AuthAction, AuthState, SessionSnapshot};
pub use cart::{CartAction, CartSnapshot, CartState, LineItem};
pub use catalog::{CatalogAction, CatalogState};
