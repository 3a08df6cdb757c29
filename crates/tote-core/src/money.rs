//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The catalog sends prices as JSON decimals:  "price": 109.95            │
//! │                                                                         │
//! │  Summing them as floats drifts:                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    add/remove the same item 1000 times → total != 0.00                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    109.95 → 10995 cents, converted ONCE at the wire boundary            │
//! │    every cart total after that is exact integer math                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tote_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let doubled = price * 2;             // $21.98
//! assert_eq!(doubled.to_decimal_string(), "21.98");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  wire price (109.95) ──► Money::from_decimal ──► Product.price          │
/// │                                                       │                 │
/// │                                  LineItem.line_total ◄┘                 │
/// │                                         │                               │
/// │                                         ▼                               │
/// │                                  Cart.total_amount ──► "109.95" in UI   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Highest accepted unit price ($10,000,000.00). A full cart of such
    /// lines stays far below the `i64` range.
    pub const MAX_UNIT_PRICE: Money = Money(1_000_000_000);

    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use tote_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount from the wire into cents.
    ///
    /// This is the only place a float is allowed to touch money. The value is
    /// rounded half away from zero to the nearest cent, so `109.95` (stored by
    /// the JSON parser as `109.9499999...`) still lands on `10995`.
    ///
    /// ```rust
    /// use tote_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(109.95).unwrap().cents(), 10995);
    /// assert_eq!(Money::from_decimal(0.1).unwrap().cents(), 10);
    /// assert!(Money::from_decimal(f64::NAN).is_err());
    /// ```
    pub fn from_decimal(amount: f64) -> CoreResult<Self> {
        if !amount.is_finite() {
            return Err(CoreError::InvalidAmount(format!("{amount} is not a finite number")));
        }

        let cents = (amount * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return Err(CoreError::InvalidAmount(format!("{amount} is out of range")));
        }

        Ok(Money(cents as i64))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Whether this can be the price of one unit: `0..=MAX_UNIT_PRICE`.
    #[inline]
    pub const fn is_valid_unit_price(&self) -> bool {
        self.0 >= 0 && self.0 <= Self::MAX_UNIT_PRICE.0
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use tote_core::money::Money;
    ///
    /// let line_total = Money::from_cents(299).multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    /// Saturates at the `i64` bounds instead of overflowing.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Renders the amount with exactly two fraction digits and no currency
    /// symbol, e.g. `"20.00"` or `"-5.50"`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `$10.99`. Localised formatting belongs to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
