//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    3 × 1.10 = 3.3000000000000003  ❌ WRONG!                             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    3 × 110 cents = 330 cents, exactly                                   │
//! │                                                                         │
//! │  Decimal text ("12.50") only exists at the CSV boundary and is          │
//! │  parsed straight into cents by `Money::parse_decimal`.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use agency_core::money::Money;
//!
//! let price = Money::from_cents(1250);
//! assert_eq!(price.to_string(), "12.50");
//!
//! let parsed = Money::parse_decimal("12.5").unwrap();
//! assert_eq!(parsed, price);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► SaleItem.unit_price_cents ──► SaleItem.line_total()
///                                                              │
///                                  Σ line_total ◄──────────────┘
///                                        │
///                                        ▼
///                              Sale.total_amount_cents
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use agency_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use agency_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(150);
    /// assert_eq!(unit_price.multiply_quantity(3).unwrap().cents(), 450);
    /// assert!(Money::from_cents(i64::MAX / 2 + 1).multiply_quantity(2).is_err());
    /// ```
    pub fn multiply_quantity(&self, qty: i64) -> CoreResult<Self> {
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or_else(|| CoreError::AmountOverflow(format!("{} x {}", self, qty)))
    }

    pub fn checked_add(self, other: Money) -> CoreResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| CoreError::AmountOverflow(format!("{} + {}", self, other)))
    }

    /// Sums amounts, failing instead of wrapping.
    ///
    /// ```rust
    /// use agency_core::money::Money;
    ///
    /// let total = Money::try_sum([Money::from_cents(1000), Money::from_cents(450)]).unwrap();
    /// assert_eq!(total.cents(), 1450);
    /// ```
    pub fn try_sum<I>(amounts: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Parses a decimal amount such as `"12.50"`, `"12.5"` or `"12"`.
    ///
    /// ## Rules
    /// - Optional leading `-`
    /// - At most two fractional digits (no silent rounding)
    /// - `,` is accepted as the decimal separator
    ///
    /// ```rust
    /// use agency_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("25.00").unwrap().cents(), 2500);
    /// assert_eq!(Money::parse_decimal("0,5").unwrap().cents(), 50);
    /// assert!(Money::parse_decimal("1.999").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let normalized = digits.replace(',', ".");
        let (whole, fraction) = match normalized.split_once('.') {
            Some((w, f)) => (w, f),
            None => (normalized.as_str(), ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a decimal number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number"));
        }
        if fraction.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount too large"))?
        };
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("expected a decimal number"))? * 10,
            _ => fraction.parse().map_err(|_| invalid("expected a decimal number"))?,
        };

        let cents = units
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal with two places, the format used in CSV files.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
