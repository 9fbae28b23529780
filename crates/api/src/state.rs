//! Shared application state for the Axum API server.

use std::sync::Arc;

use hrdesk_common::config::AppConfig;

use crate::sessions::SessionRegistry;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(sessions: Arc<SessionRegistry>, config: AppConfig) -> Self {
        Self { sessions, config }
    }
}
