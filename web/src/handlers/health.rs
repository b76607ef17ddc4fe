//! Liveness endpoint.
//!
//! Used by Kubernetes liveness probes. It does not touch the database.

use axum::http::StatusCode;

/// Simple health check.
///
/// ```text
/// GET /health  →  200 "ok"
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
