//! # Error Types
//!
//! Domain-specific error types for agency-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  agency-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  agency-db errors                                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  agency-server errors                                                  │
//! │  └── ApiError         - What HTTP clients see                          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Response     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::MovementType;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Sale item not found: {0}")]
    SaleItemNotFound(String),

    /// Not enough stock to complete a sale or record an outbound movement.
    ///
    /// ## User Workflow
    /// ```text
    /// Complete sale (item: 5 × LED-RED)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "LED Rouge 5mm", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Nothing changes: levels, ledger and sale status stay as they were
    /// ```
    #[error("Insufficient stock for {product} ({sku}): available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Completing a cancelled sale
    /// - Adding or removing items once the sale left PENDING
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Movement type the ledger cannot apply on its own.
    #[error("{movement_type} movements are not supported")]
    UnsupportedMovement { movement_type: MovementType },

    /// A computed amount left the `i64` cents range.
    #[error("Amount overflow while computing {0}")]
    AmountOverflow(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic or SQL runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;
