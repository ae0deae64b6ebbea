//! # Routes
//!
//! ```text
//! /health                         liveness + database check
//! /api/categories                 catalogue categories
//! /api/products                   catalogue, CSV export/import
//! /api/stock                      levels, thresholds, ledger, reports
//! /api/customers                  customers, CSV export/import
//! /api/sales                      sales, items, lifecycle, reports
//! /api/dashboard                  overview
//! ```

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod categories;
pub mod customers;
pub mod dashboard;
pub mod products;
pub mod sales;
pub mod stock;
pub mod system;

/// Every route, bound to `state`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/stock", stock::router())
        .nest("/customers", customers::router())
        .nest("/sales", sales::router())
        .nest("/dashboard", dashboard::router());

    Router::new()
        .route("/health", get(system::health))
        .nest("/api", api)
        .with_state(state)
}

/// A CSV download named `filename`.
pub(crate) fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
