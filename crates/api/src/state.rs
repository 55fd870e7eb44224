//! Shared application state for the Axum API server.

use std::sync::Arc;

use sqlx::PgPool;

use placement_common::config::AppConfig;
use placement_notifier::{Dispatcher, ProviderSet};

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub providers: Arc<ProviderSet>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        providers: Arc<ProviderSet>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            pool,
            config,
            providers,
            dispatcher,
        }
    }
}
