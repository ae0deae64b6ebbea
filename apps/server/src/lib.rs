//! # agency-server
//!
//! HTTP API for the parts agency back office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Agency API Server                              │
//! │                                                                         │
//! │  Client / proxy (X-Actor) ───► axum router ───► agency-db ───► SQLite  │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │                       request logging middleware                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`build_app`] is shared by the binary and the black-box tests, so both
//! exercise the same router.

pub mod actor;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;

use agency_db::{Database, DbConfig, DbResult};

pub use config::ServerConfig;
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

/// The full router with logging applied.
pub fn build_app(state: AppState) -> Router {
    routes::router(state).layer(axum::middleware::from_fn(middleware::log_requests))
}

/// Opens (and migrates) the database named by `config`.
pub async fn open_database(config: &ServerConfig) -> DbResult<Database> {
    let db_config = if config.is_in_memory() {
        DbConfig::in_memory()
    } else {
        DbConfig::new(config.database_path.clone()).max_connections(config.max_connections)
    };
    Database::new(db_config).await
}
