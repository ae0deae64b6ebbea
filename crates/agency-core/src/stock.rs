//! # Stock Rules
//!
//! Balance arithmetic and status derivation for [`StockLevel`].
//!
//! ## Movement Semantics
//! ```text
//! ┌──────────────┬──────────────────────────────┬─────────────────────────┐
//! │ Type         │ New balance                  │ Rejected when           │
//! ├──────────────┼──────────────────────────────┼─────────────────────────┤
//! │ IN           │ current + quantity           │ never                   │
//! │ OUT          │ current − quantity           │ result < 0              │
//! │ ADJUSTMENT   │ quantity                     │ never                   │
//! │ TRANSFER     │ -                            │ always (no destination) │
//! └──────────────┴──────────────────────────────┴─────────────────────────┘
//! ```
//!
//! The balance can never go below zero. Callers that get an error must
//! leave both the balance and the ledger untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::types::{MovementType, StockLevel};
use crate::{DEFAULT_MAXIMUM_STOCK, DEFAULT_MINIMUM_STOCK};

// =============================================================================
// Stock Status
// =============================================================================

/// Derived availability of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    /// Derives the status. Out of stock wins over low stock.
    pub fn of(current: i64, minimum: i64) -> Self {
        if current == 0 {
            StockStatus::OutOfStock
        } else if current <= minimum {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of stock",
            StockStatus::LowStock => "Low stock",
            StockStatus::InStock => "In stock",
        }
    }
}

impl StockLevel {
    /// A fresh level with default thresholds and a zero balance.
    pub fn empty(id: String, product_id: String, now: DateTime<Utc>) -> Self {
        StockLevel {
            id,
            product_id,
            current_stock: 0,
            minimum_stock: DEFAULT_MINIMUM_STOCK,
            maximum_stock: DEFAULT_MAXIMUM_STOCK,
            last_updated: now,
        }
    }

    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        self.current_stock == 0
    }

    /// At or below the minimum. Includes out of stock.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }

    #[inline]
    pub fn status(&self) -> StockStatus {
        StockStatus::of(self.current_stock, self.minimum_stock)
    }
}

// =============================================================================
// Balance Arithmetic
// =============================================================================

/// Why a movement cannot be applied to a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceError {
    Insufficient { available: i64, requested: i64 },
    Unsupported(MovementType),
}

impl BalanceError {
    /// Attaches the product identity for the caller-facing error.
    pub fn into_core(self, product: &str, sku: &str) -> CoreError {
        match self {
            BalanceError::Insufficient {
                available,
                requested,
            } => CoreError::InsufficientStock {
                product: product.to_string(),
                sku: sku.to_string(),
                available,
                requested,
            },
            BalanceError::Unsupported(movement_type) => {
                CoreError::UnsupportedMovement { movement_type }
            }
        }
    }
}

/// Computes the balance after applying a movement.
///
/// ```rust
/// use agency_core::stock::next_balance;
/// use agency_core::MovementType;
///
/// assert_eq!(next_balance(10, MovementType::In, 5), Ok(15));
/// assert_eq!(next_balance(10, MovementType::Adjustment, 3), Ok(3));
/// assert!(next_balance(2, MovementType::Out, 5).is_err());
/// ```
pub fn next_balance(
    current: i64,
    movement_type: MovementType,
    quantity: i64,
) -> Result<i64, BalanceError> {
    match movement_type {
        MovementType::In => Ok(current + quantity),
        MovementType::Out => {
            if quantity > current {
                Err(BalanceError::Insufficient {
                    available: current,
                    requested: quantity,
                })
            } else {
                Ok(current - quantity)
            }
        }
        MovementType::Adjustment => Ok(quantity),
        MovementType::Transfer => Err(BalanceError::Unsupported(MovementType::Transfer)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
