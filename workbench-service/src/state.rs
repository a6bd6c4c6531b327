//! Application state for workbench service.

use common::config::AppConfig;

use crate::upload::FileStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub file_store: FileStore,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig, file_store: FileStore) -> Self {
        Self { config, file_store }
    }
}
