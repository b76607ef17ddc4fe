//! HTTP server module for the storefront.
//!
//! This module provides the Axum-based HTTP server with:
//! - Application state management
//! - Root acknowledgement and readiness endpoints
//! - Request context (correlation ids, request spans)
//! - Router configuration

pub mod health;
pub mod middleware;
pub mod routes;
pub mod state;

pub use health::{readiness_check, root, ROOT_MESSAGE};
pub use middleware::{request_area, request_context};
pub use routes::build_router;
pub use state::AppState;
