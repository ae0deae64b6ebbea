//! # agency-db: Database Layer for the Parts Agency
//!
//! SQLite storage for the catalogue, the stock ledger, customers and sales,
//! built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Parts Agency Data Flow                           │
//! │                                                                         │
//! │  HTTP handler (POST /api/sales/{id}/complete)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     agency-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ products      │    │  (embedded)  │  │   │
//! │  │   │               │    │ stock ledger  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ sales         │    │ 0001_*.sql   │  │   │
//! │  │   │               │    │ dashboard     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │            ▲                                                    │   │
//! │  │            └──── CsvExchange (import/export), seed             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (agency.db)                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories (category, product, stock, customer, sale, dashboard)
//! - [`import_export`] - CSV import and export
//! - [`seed`] - Reproducible sample data
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agency_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("agency.db")).await?;
//!
//! let low = db.stock().alerts().await?;
//! let sale = db.sales().complete(&sale_id, "admin").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod import_export;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use import_export::{CsvExchange, IMPORT_REFERENCE};
pub use pool::{ClearReport, Database, DbConfig};
pub use seed::{SeedConfig, SeedReport};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::customer::CustomerRepository;
pub use repository::dashboard::{
    DailySales, DashboardOverview, DashboardRepository, MonthlySales, TopProduct,
};
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::{MovementOutcome, StockOverview, StockRepository, StockSummaryEntry};
