//! # Cart Slice
//!
//! Pure, synchronous shopping cart. Every operation is total: bad input is
//! clamped or ignored, never an error.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Operations                                   │
//! │                                                                         │
//! │  CartAction              Line present?     Effect                       │
//! │  ──────────              ─────────────     ──────                       │
//! │  Add(product)            yes               qty + 1, snapshot refreshed  │
//! │                          no                push line, qty = 1           │
//! │  Remove(id)              yes / no          delete line / no-op          │
//! │  SetQuantity(id, q)      q <= 0            same as Remove               │
//! │                          q > 0             qty = min(q, 999)            │
//! │  Decrease(id)            qty > 1           qty - 1                      │
//! │                          qty == 1          delete line                  │
//! │  Clear                   -                 no lines, totals zero        │
//! │                                                                         │
//! │  After EVERY change: totals are recomputed from the lines.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `total_item_count == Σ quantity`
//! - `total_amount == Σ price × quantity`
//! - every quantity is within `1..=MAX_ITEM_QUANTITY`
//! - lines are unique by product id and keep insertion order

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::request::Outcome;
use crate::types::{Product, ProductId};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Line Item
// =============================================================================

/// One cart line: a product snapshot and how many of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Product data as of the last add.
    pub product: Product,

    /// Always at least 1.
    pub quantity: i64,
}

impl LineItem {
    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.product.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart Actions
// =============================================================================

/// Mutations accepted by the cart slice.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    Add(Product),
    Remove(ProductId),
    SetQuantity { id: ProductId, quantity: i64 },
    Decrease(ProductId),
    Clear,
    /// Replace the cart with a persisted snapshot.
    Rehydrate(CartSnapshot),
}

// =============================================================================
// Cart Snapshot
// =============================================================================

/// The persisted projection of the cart.
///
/// The stored totals are kept for compatibility with older snapshots, but on
/// rehydration they are always re-derived from the lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub line_items: Vec<LineItem>,
    pub total_item_count: i64,
    pub total_amount: Money,
}

impl CartSnapshot {
    /// Whether the stored totals agree with the stored lines.
    pub fn is_consistent(&self) -> bool {
        let amount: Money = self.line_items.iter().map(LineItem::line_total).sum();
        total_quantity(&self.line_items) == self.total_item_count && amount == self.total_amount
    }
}

// =============================================================================
// Cart State
// =============================================================================

/// The shopping cart.
///
/// Fields are private so the totals can only change through [`CartState::reduce`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartState {
    line_items: Vec<LineItem>,
    total_item_count: i64,
    total_amount: Money,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Looks up the line for a product.
    pub fn line(&self, id: ProductId) -> Option<&LineItem> {
        self.line_items.iter().find(|l| l.product.id == id)
    }

    pub fn total_item_count(&self) -> i64 {
        self.total_item_count
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// Projection written to storage.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            line_items: self.line_items.clone(),
            total_item_count: self.total_item_count,
            total_amount: self.total_amount,
        }
    }

    /// Applies one action and recomputes the totals.
    pub fn reduce(&mut self, action: CartAction) -> Outcome {
        let changed = match action {
            CartAction::Add(product) => {
                self.add(product);
                true
            }
            CartAction::Remove(id) => self.remove(id),
            CartAction::SetQuantity { id, quantity } => self.set_quantity(id, quantity),
            CartAction::Decrease(id) => self.decrease(id),
            CartAction::Clear => {
                let had_lines = !self.line_items.is_empty();
                self.line_items.clear();
                had_lines
            }
            CartAction::Rehydrate(snapshot) => {
                self.line_items = sanitize_lines(snapshot.line_items);
                true
            }
        };

        if changed {
            self.recompute();
        }
        Outcome::changed(changed)
    }

    fn add(&mut self, product: Product) {
        match self.line_items.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => {
                line.quantity = clamp_quantity(line.quantity + 1);
                line.product = product;
            }
            None => self.line_items.push(LineItem {
                product,
                quantity: 1,
            }),
        }
    }

    fn remove(&mut self, id: ProductId) -> bool {
        let before = self.line_items.len();
        self.line_items.retain(|l| l.product.id != id);
        self.line_items.len() != before
    }

    fn set_quantity(&mut self, id: ProductId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(id);
        }

        match self.line_items.iter_mut().find(|l| l.product.id == id) {
            Some(line) => {
                let quantity = clamp_quantity(quantity);
                let changed = line.quantity != quantity;
                line.quantity = quantity;
                changed
            }
            None => false,
        }
    }

    fn decrease(&mut self, id: ProductId) -> bool {
        let Some(index) = self.line_items.iter().position(|l| l.product.id == id) else {
            return false;
        };

        if self.line_items[index].quantity > 1 {
            self.line_items[index].quantity -= 1;
        } else {
            self.line_items.remove(index);
        }
        true
    }

    /// Full recomputation, never incremental.
    fn recompute(&mut self) {
        self.total_item_count = total_quantity(&self.line_items);
        self.total_amount = self.line_items.iter().map(LineItem::line_total).sum();
    }
}

/// Saturating, so a tampered snapshot can't overflow it.
fn total_quantity(lines: &[LineItem]) -> i64 {
    lines
        .iter()
        .fold(0i64, |total, line| total.saturating_add(line.quantity))
}

fn clamp_quantity(quantity: i64) -> i64 {
    quantity.clamp(1, MAX_ITEM_QUANTITY)
}

/// Drops non-positive lines and lines without a valid unit price, clamps
/// oversize quantities and merges duplicate ids (first position wins,
/// quantities add up).
fn sanitize_lines(lines: Vec<LineItem>) -> Vec<LineItem> {
    let mut clean: Vec<LineItem> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity < 1 || !line.product.price.is_valid_unit_price() {
            continue;
        }
        match clean.iter_mut().find(|l| l.product.id == line.product.id) {
            Some(existing) => {
                existing.quantity = clamp_quantity(existing.quantity.saturating_add(line.quantity));
            }
            None => clean.push(LineItem {
                quantity: clamp_quantity(line.quantity),
                product: line.product,
            }),
        }
    }
    clean
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rating;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn product(id: u64, cents: i64) -> Product {
        Product {
            id: ProductId(id),
            title: format!("Product {id}"),
            price: Money::from_cents(cents),
            image: format!("https://example.test/{id}.jpg"),
            category: "electronics".to_string(),
            description: String::new(),
            rating: Rating::new(4.0, 10),
        }
    }

    fn assert_invariants(cart: &CartState) {
        let count: i64 = cart.line_items().iter().map(|l| l.quantity).sum();
        let amount: Money = cart.line_items().iter().map(LineItem::line_total).sum();
        assert_eq!(cart.total_item_count(), count);
        assert_eq!(cart.total_amount(), amount);
        for line in cart.line_items() {
            assert!((1..=MAX_ITEM_QUANTITY).contains(&line.quantity));
        }
        let mut ids: Vec<_> = cart.line_items().iter().map(|l| l.product.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), cart.line_items().len());
    }

    #[test]
    fn test_add_same_product_twice() {
        let mut cart = CartState::new();
        let a = product(1, 1000);

        cart.reduce(CartAction::Add(a.clone()));
        cart.reduce(CartAction::Add(a));

        assert_eq!(cart.line_items().len(), 1);
        assert_eq!(cart.line(ProductId(1)).unwrap().quantity, 2);
        assert_eq!(cart.total_item_count(), 2);
        assert_eq!(cart.total_amount().to_decimal_string(), "20.00");
    }

    #[test]
    fn test_add_refreshes_snapshot() {
        let mut cart = CartState::new();
        cart.reduce(CartAction::Add(product(1, 1000)));

        let mut repriced = product(1, 1200);
        repriced.title = "Renamed".to_string();
        cart.reduce(CartAction::Add(repriced));

        let line = cart.line(ProductId(1)).unwrap();
        assert_eq!(line.product.title, "Renamed");
        assert_eq!(cart.total_amount().cents(), 2400);
    }

    #[test]
    fn test_remove_keeps_other_lines() {
        let mut cart = CartState::new();
        cart.reduce(CartAction::Add(product(1, 1000)));
        cart.reduce(CartAction::Add(product(2, 550)));

        cart.reduce(CartAction::Remove(ProductId(1)));

        assert_eq!(cart.line_items().len(), 1);
        assert_eq!(cart.line_items()[0].product.id, ProductId(2));
        assert_eq!(cart.total_item_count(), 1);
        assert_eq!(cart.total_amount().to_decimal_string(), "5.50");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = CartState::new();
        cart.reduce(CartAction::Add(product(1, 1000)));
        cart.reduce(CartAction::Add(product(2, 550)));

        assert_eq!(cart.reduce(CartAction::Remove(ProductId(1))), Outcome::Applied);
        let once = cart.clone();
        assert_eq!(cart.reduce(CartAction::Remove(ProductId(1))), Outcome::NoOp);
        assert_eq!(cart, once);
    }

    #[test]
    fn test_set_quantity_non_positive_removes() {
        for quantity in [0, -5] {
            let mut cart = CartState::new();
            cart.reduce(CartAction::Add(product(1, 1000)));
            cart.reduce(CartAction::SetQuantity {
                id: ProductId(1),
                quantity,
            });
            assert!(cart.is_empty());
            assert_eq!(cart.total_item_count(), 0);
            assert!(cart.total_amount().is_zero());
        }
    }

    #[test]
    fn test_set_quantity_absent_is_noop() {
        let mut cart = CartState::new();
        let outcome = cart.reduce(CartAction::SetQuantity {
            id: ProductId(9),
            quantity: 3,
        });
        assert_eq!(outcome, Outcome::NoOp);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_clamps_to_max() {
        let mut cart = CartState::new();
        cart.reduce(CartAction::Add(product(1, 100)));
        cart.reduce(CartAction::SetQuantity {
            id: ProductId(1),
            quantity: 5000,
        });
        assert_eq!(cart.total_item_count(), MAX_ITEM_QUANTITY);
        assert_eq!(cart.total_amount().cents(), 100 * MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_decrease_from_one_removes() {
        let mut cart = CartState::new();
        cart.reduce(CartAction::Add(product(1, 1000)));
        cart.reduce(CartAction::Decrease(ProductId(1)));

        assert!(cart.is_empty());
        assert_eq!(cart.total_item_count(), 0);
        assert!(cart.total_amount().is_zero());
        assert_eq!(cart.reduce(CartAction::Decrease(ProductId(1))), Outcome::NoOp);
    }

    #[test]
    fn test_decrease_decrements() {
        let mut cart = CartState::new();
        cart.reduce(CartAction::Add(product(1, 1000)));
        cart.reduce(CartAction::SetQuantity {
            id: ProductId(1),
            quantity: 3,
        });
        cart.reduce(CartAction::Decrease(ProductId(1)));
        assert_eq!(cart.line(ProductId(1)).unwrap().quantity, 2);
        assert_eq!(cart.total_amount().cents(), 2000);
    }

    #[test]
    fn test_clear() {
        let mut cart = CartState::new();
        assert_eq!(cart.reduce(CartAction::Clear), Outcome::NoOp);

        cart.reduce(CartAction::Add(product(1, 1000)));
        cart.reduce(CartAction::Add(product(2, 550)));
        assert_eq!(cart.reduce(CartAction::Clear), Outcome::Applied);
        assert_eq!(cart, CartState::new());
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut cart = CartState::new();
        for id in [3, 1, 2] {
            cart.reduce(CartAction::Add(product(id, 100)));
        }
        cart.reduce(CartAction::Add(product(1, 100)));

        let ids: Vec<u64> = cart.line_items().iter().map(|l| l.product.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_rehydrate_recomputes_totals() {
        let snapshot = CartSnapshot {
            line_items: vec![
                LineItem {
                    product: product(1, 1000),
                    quantity: 2,
                },
                LineItem {
                    product: product(2, 550),
                    quantity: 0,
                },
                LineItem {
                    product: product(3, 100),
                    quantity: 4000,
                },
            ],
            total_item_count: 1,
            total_amount: Money::from_cents(1),
        };
        assert!(!snapshot.is_consistent());

        let mut cart = CartState::new();
        cart.reduce(CartAction::Rehydrate(snapshot));

        assert_eq!(cart.line_items().len(), 2);
        assert_eq!(cart.total_item_count(), 2 + MAX_ITEM_QUANTITY);
        assert_eq!(cart.total_amount().cents(), 2000 + 100 * MAX_ITEM_QUANTITY);
        assert!(cart.snapshot().is_consistent());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut cart = CartState::new();
        cart.reduce(CartAction::Add(product(1, 10995)));
        cart.reduce(CartAction::Add(product(2, 2230)));
        cart.reduce(CartAction::Add(product(1, 10995)));

        let json = serde_json::to_string(&cart.snapshot()).unwrap();
        let snapshot: CartSnapshot = serde_json::from_str(&json).unwrap();

        let mut restored = CartState::new();
        restored.reduce(CartAction::Rehydrate(snapshot));
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_rehydrate_tampered_quantities() {
        let snapshot = CartSnapshot {
            line_items: vec![
                LineItem {
                    product: product(1, 1000),
                    quantity: 5,
                },
                LineItem {
                    product: product(1, 1000),
                    quantity: i64::MAX,
                },
                LineItem {
                    product: product(2, 550),
                    quantity: i64::MAX,
                },
            ],
            total_item_count: 3,
            total_amount: Money::from_cents(1),
        };
        assert!(!snapshot.is_consistent());

        let mut cart = CartState::new();
        cart.reduce(CartAction::Rehydrate(snapshot));

        assert_eq!(cart.line_items().len(), 2);
        assert_eq!(cart.line(ProductId(1)).unwrap().quantity, MAX_ITEM_QUANTITY);
        assert_eq!(cart.total_item_count(), 2 * MAX_ITEM_QUANTITY);
        assert_invariants(&cart);
    }

    #[test]
    fn test_rehydrate_drops_out_of_range_prices() {
        let snapshot = CartSnapshot {
            line_items: vec![
                LineItem {
                    product: product(1, i64::MAX),
                    quantity: 10,
                },
                LineItem {
                    product: product(2, -100),
                    quantity: 1,
                },
                LineItem {
                    product: product(3, 250),
                    quantity: 2,
                },
            ],
            total_item_count: 0,
            total_amount: Money::zero(),
        };
        assert!(!snapshot.is_consistent());

        let mut cart = CartState::new();
        cart.reduce(CartAction::Rehydrate(snapshot));

        assert_eq!(cart.line_items().len(), 1);
        assert_eq!(cart.total_amount().cents(), 500);
    }

    #[test]
    fn test_huge_price_does_not_overflow() {
        let mut cart = CartState::new();
        cart.reduce(CartAction::Add(product(1, 1_000_000_000_000_000_000)));
        cart.reduce(CartAction::SetQuantity {
            id: ProductId(1),
            quantity: 10,
        });
        assert_eq!(cart.total_item_count(), 10);
        assert_eq!(cart.total_amount().cents(), i64::MAX);
    }

    /// Random operation sequences never break the invariants.
    #[test]
    fn test_invariants_hold_for_random_sequences() {
        let mut rng = StdRng::seed_from_u64(0x7073);
        let catalog: Vec<Product> = (1..=6)
            .map(|id| product(id, rng.random_range(0..20_000)))
            .collect();

        for _ in 0..50 {
            let mut cart = CartState::new();
            for _ in 0..200 {
                let pick = &catalog[rng.random_range(0..catalog.len())];
                let action = match rng.random_range(0..40) {
                    0..=14 => CartAction::Add(pick.clone()),
                    15..=21 => CartAction::Remove(pick.id),
                    22..=29 => CartAction::SetQuantity {
                        id: pick.id,
                        quantity: rng.random_range(-3..1200),
                    },
                    30..=38 => CartAction::Decrease(pick.id),
                    _ => CartAction::Clear,
                };
                cart.reduce(action);
                assert_invariants(&cart);
            }
        }
    }
}
