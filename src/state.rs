use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;

/// Shared per-process context: the store handle and immutable configuration,
/// constructed once in main and cloned into every handler via axum State.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}
