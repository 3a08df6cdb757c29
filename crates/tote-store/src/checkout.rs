//! # Checkout
//!
//! Simulated checkout: no payment is taken. The receipt records what the cart
//! held when the order was placed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tote_core::{CartState, LineItem, Money};

/// Record of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub item_count: i64,
    pub total_amount: Money,
    pub lines: Vec<LineItem>,
    pub placed_at: DateTime<Utc>,
}

impl CheckoutReceipt {
    /// Builds a receipt from a non-empty cart. `None` for an empty one.
    pub fn from_cart(cart: &CartState) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }
        Some(CheckoutReceipt {
            order_id: Uuid::new_v4(),
            item_count: cart.total_item_count(),
            total_amount: cart.total_amount(),
            lines: cart.line_items().to_vec(),
            placed_at: Utc::now(),
        })
    }

    /// "Order placed: 3 items, total $42.00".
    pub fn summary(&self) -> String {
        let noun = if self.item_count == 1 { "item" } else { "items" };
        format!(
            "Order placed: {} {}, total {}",
            self.item_count, noun, self.total_amount
        )
    }
}
