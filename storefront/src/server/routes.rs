//! Router configuration for the storefront.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{readiness_check, root};
use super::middleware::request_context;
use super::state::AppState;
use crate::api::route_groups;
use axum::{middleware::from_fn, routing::get, Router};
use storefront_web::{cors::permissive_cors, handlers::health_check, static_files::mount_if_present};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Build the complete Axum router.
///
/// Configures:
/// - `GET /` acknowledgement, `/health` and `/ready`
/// - The four route groups under `/api`
/// - `/images`, when the images directory exists
/// - Permissive CORS and correlation ids on every route
pub fn build_router(state: AppState) -> Router {
    let mut api_routes = Router::new();
    for group in route_groups() {
        debug!(group = group.name, "Registering route group");
        api_routes = api_routes.merge(group.router);
    }

    let router = Router::new()
        .route("/", get(root))
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes);

    let assets = &state.config.assets;
    let (router, _mounted) = mount_if_present(router, &assets.mount_path, &assets.images_dir);

    warn!("CORS allows any origin with credentials; narrow it before exposing publicly");

    router
        .layer(TraceLayer::new_for_http())
        .layer(permissive_cors())
        .layer(from_fn(request_context))
        .with_state(state)
}
