pub mod applications;
pub mod auth;
pub mod campaigns;
pub mod health;
pub mod jobs;
pub mod students;
pub mod webhooks;

use axum::Router;
use serde::Deserialize;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(jobs::router())
        .merge(applications::router())
        .merge(students::router())
        .merge(campaigns::router())
        .merge(webhooks::router())
        .with_state(state)
}

/// Common `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Clamp to page >= 1 and 1 <= limit <= 100, returning (limit, offset).
    pub fn limit_offset(self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(20).clamp(1, 100);
        (limit, (page - 1) * limit)
    }

    pub fn page(self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}
