//! Application state for the storefront HTTP server.
//!
//! Built once by the bootstrap and cloned per request; every field is a
//! cheap handle (`PgPool` and `Arc`).

use crate::auth::SessionStore;
use crate::config::Config;
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool for all route groups
    pub pool: PgPool,

    /// Bearer-token session store
    pub sessions: SessionStore,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(pool: PgPool, config: Arc<Config>) -> Self {
        let sessions = SessionStore::new(pool.clone(), config.auth.session_ttl);
        Self {
            pool,
            sessions,
            config,
        }
    }
}

// Lets `SessionUser` pull the session store out of the state
impl FromRef<AppState> for SessionStore {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sessions.clone()
    }
}
