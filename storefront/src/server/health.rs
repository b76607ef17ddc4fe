//! Root acknowledgement and readiness endpoints.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Payload returned by `GET /`.
pub const ROOT_MESSAGE: &str = "Backend running with PostgreSQL in Kubernetes";

/// Root response body.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    /// Fixed acknowledgement
    pub message: &'static str,
}

/// `GET /`: fixed acknowledgement that the backend is up.
///
/// ```bash
/// curl http://localhost:8000/
/// # {"message":"Backend running with PostgreSQL in Kubernetes"}
/// ```
#[allow(clippy::unused_async)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE,
    })
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Database connectivity
    pub database: bool,
}

/// `GET /ready`: 200 when the database answers, 503 otherwise.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}
