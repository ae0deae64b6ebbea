//! Shared application state.

use std::sync::Arc;

use agency_core::PageRequest;
use agency_db::Database;
use serde::Deserialize;

use crate::config::ServerConfig;

/// Handed to every handler. Cloning is cheap: the pool and the config are
/// reference counted.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }

    /// Page request with the configured default and bound applied.
    pub fn page(&self, query: PageQuery) -> PageRequest {
        PageRequest::new(
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(self.config.default_page_size),
        )
        .normalized(self.config.max_page_size)
    }
}

/// `?page=&per_page=` on list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
