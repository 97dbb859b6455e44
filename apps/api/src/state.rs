use sqlx::SqlitePool;

use crate::config::Config;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    /// Anti-forgery tokens per browser session. Lives only as long as the process.
    pub sessions: SessionStore,
}
