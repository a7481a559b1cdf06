//! # Money Module
//!
//! Provides the `Money` type for order line and total amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A standing order for 12 rusk packs at ₹18.30 each:                    │
//! │    12 × 18.30 = 219.60000000000002   ❌ in f64                          │
//! │                                                                         │
//! │  Repeated every day for a year, reports stop reconciling.              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    12 × 1830 paise = 21960 paise = ₹219.60 exactly                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use hearth_core::money::Money;
//!
//! let unit = Money::from_paise(1830); // ₹18.30
//! let line = unit.multiply_quantity(12).unwrap();
//! assert_eq!(line.paise(), 21960);
//! assert_eq!(line.to_string(), "₹219.60");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and adjustments can be negative
/// - **Tuple struct**: zero-cost over i64, serializes as a bare integer
/// - **Checked line math**: a runaway quantity must fail loudly, not wrap
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ```rust
    /// use hearth_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_paise(18, 30).paise(), 1830);
    /// assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    /// ```
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero rupees.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// Returns `None` on overflow.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug display in rupees. Customer-facing formatting belongs to the apps.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₹{}.{:02}",
            sign,
            self.rupees().abs(),
            self.paise_part()
        )
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1830);
        assert_eq!(money.paise(), 1830);
        assert_eq!(money.rupees(), 18);
        assert_eq!(money.paise_part(), 30);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(21960).to_string(), "₹219.60");
        assert_eq!(Money::from_paise(500).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_multiply_quantity() {
        let unit = Money::from_paise(4500);
        assert_eq!(unit.multiply_quantity(3), Some(Money::from_paise(13500)));
        assert_eq!(Money::from_paise(i64::MAX).multiply_quantity(2), None);
    }

    #[test]
    fn test_sum() {
        let lines = [
            Money::from_paise(13500),
            Money::from_paise(2000),
            Money::from_paise(99),
        ];
        let total: Money = lines.iter().sum();
        assert_eq!(total.paise(), 15599);
        assert!(!total.is_zero());
        assert!(!total.is_negative());
    }

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(Money::from_paise(i64::MAX).checked_add(Money::from_paise(1)), None);
        assert_eq!(
            Money::from_paise(1).checked_add(Money::from_paise(2)),
            Some(Money::from_paise(3))
        );
    }
}
