//! # agency-core: Pure Business Logic for the Parts Agency
//!
//! This crate holds the domain model and every business rule of the agency
//! back office as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Parts Agency Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    agency-server (axum)                         │   │
//! │  │    /api/products  /api/stock  /api/sales  /api/dashboard        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ agency-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  stock  │ │  sale   │ │ records │  │   │
//! │  │   │ Product │ │  Money  │ │ status  │ │ states  │ │  CSV    │  │   │
//! │  │   │  Sale   │ │         │ │ balance │ │ totals  │ │ shapes  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    agency-db (Database Layer)                   │   │
//! │  │         SQLite queries, transactions, CSV, repositories         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities, read models and inputs
//! - [`money`] - Integer-cent money
//! - [`stock`] - Stock status and balance arithmetic
//! - [`sale`] - Sale state machine, totals, completion planning
//! - [`filter`] - Typed list criteria and pagination
//! - [`records`] - CSV row shapes and import reports
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use agency_core::stock::StockStatus;
//!
//! // 10 in stock, minimum 10: at the threshold
//! assert_eq!(StockStatus::of(10, 10), StockStatus::LowStock);
//! assert_eq!(StockStatus::of(0, 10).label(), "Out of stock");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod filter;
pub mod money;
pub mod records;
pub mod sale;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use filter::{PageRequest, Paged};
pub use money::Money;
pub use stock::StockStatus;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Minimum threshold of a freshly created stock level.
pub const DEFAULT_MINIMUM_STOCK: i64 = 0;

/// Maximum threshold of a freshly created stock level.
pub const DEFAULT_MAXIMUM_STOCK: i64 = 1000;

/// Upper bound for any single quantity (line item, movement, threshold).
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Largest accepted price in cents (ten digits, two of them decimals).
pub const MAX_PRICE_CENTS: i64 = 9_999_999_999;
