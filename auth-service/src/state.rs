//! Application state for auth service.

use common::config::AppConfig;

use crate::store::CredentialStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: CredentialStore,
}

impl AppState {
    /// Creates a new application state around an already-opened store.
    pub fn new(config: AppConfig, store: CredentialStore) -> Self {
        Self { config, store }
    }
}
