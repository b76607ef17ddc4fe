//! Cross-origin policy.
//!
//! The storefront frontend may be served from any host during development, so
//! the backend accepts cross-origin requests from every origin, with
//! credentials, for any method and any header.
//!
//! Browsers refuse a literal `*` together with
//! `Access-Control-Allow-Credentials: true`, so the policy mirrors the request
//! instead: the `Origin`, the requested method and the requested headers are
//! echoed back.
//!
//! Not suitable for production without narrowing the origin list.

use axum::http::HeaderName;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Blanket-permissive CORS layer (any origin, credentials, any method/header).
#[must_use]
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([HeaderName::from_static(EXPOSED_CORRELATION_HEADER)])
}

// Lowercase form of `CORRELATION_ID_HEADER`, as `HeaderName::from_static` requires.
const EXPOSED_CORRELATION_HEADER: &str = "x-correlation-id";
