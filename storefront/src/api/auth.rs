//! Account and session endpoints.
//!
//! - POST /api/signup - Create an account and open a session
//! - POST /api/login - Open a session for an existing account
//! - POST /api/logout - Revoke the current session
//! - GET /api/me - Who am I

use crate::auth::{hash_password, verify_password, verify_unknown_user, SessionUser};
use crate::server::state::AppState;
use crate::types::UserId;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_web::{error::AppError, CorrelationId};
use tracing::{info, warn};
use uuid::Uuid;

/// Username length bounds, in characters.
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=64;

/// Password length bounds, in characters.
pub const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=128;

/// Signup and login body.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Account name
    pub username: String,
    /// Plain-text password
    pub password: String,
}

/// Signup response.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    /// Human-readable outcome
    pub message: &'static str,
    /// Session token
    pub token: String,
    /// Normalized username
    pub username: String,
    /// Session expiry
    pub expires_at: DateTime<Utc>,
}

/// Login response.
///
/// Carries the token under both `token` and `access_token`; clients read
/// either.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Human-readable outcome
    pub message: &'static str,
    /// Session token
    pub token: String,
    /// Same token, OAuth-style field name
    pub access_token: String,
    /// Always `bearer`
    pub token_type: &'static str,
    /// Session expiry
    pub expires_at: DateTime<Utc>,
}

/// `GET /api/me` response.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// User ID
    pub id: Uuid,
    /// Username
    pub username: String,
}

/// Routes of the auth group.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Check credential shape and return the normalized username.
///
/// Usernames are trimmed, must be 3 to 64 characters, and may contain ASCII
/// letters, digits, `.`, `_` and `-`. Passwords are not trimmed.
///
/// # Errors
///
/// Returns 422 describing the first violated rule.
pub fn validate_credentials(username: &str, password: &str) -> Result<String, AppError> {
    let username = username.trim();

    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(AppError::validation(format!(
            "username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(AppError::validation(
            "username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    if !PASSWORD_LEN.contains(&password.chars().count()) {
        return Err(AppError::validation(format!(
            "password must be between {} and {} characters",
            PASSWORD_LEN.start(),
            PASSWORD_LEN.end()
        )));
    }

    Ok(username.to_owned())
}

/// Create an account.
///
/// ```bash
/// curl -X POST http://localhost:8000/api/signup \
///   -H "Content-Type: application/json" \
///   -d '{"username": "alice", "password": "wonderland"}'
/// ```
///
/// # Errors
///
/// 422 for malformed credentials, 409 if the username is taken.
pub async fn signup(
    CorrelationId(correlation_id): CorrelationId,
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let username = validate_credentials(&request.username, &request.password)?;

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::internal("Password hashing failed").with_source(e))?
        .map_err(|e| AppError::internal("Password hashing failed").with_source(e))?;

    let user_id = UserId::new();
    let inserted = sqlx::query(
        "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3)
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(user_id.as_uuid())
    .bind(&username)
    .bind(&password_hash)
    .execute(&state.pool)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Err(AppError::conflict(format!("username {username} is already taken")));
    }

    let session = state.sessions.create(user_id).await?;
    info!(%correlation_id, user_id = %user_id, username = %username, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Signup successful",
            token: session.token,
            username,
            expires_at: session.expires_at,
        }),
    ))
}

/// Log in with username and password.
///
/// # Errors
///
/// 401 for an unknown user or a wrong password; both read the same.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::unauthorized("Invalid username or password");

    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, password_hash FROM users WHERE username = $1")
            .bind(request.username.trim())
            .fetch_optional(&state.pool)
            .await?;

    // Unknown users cost one verification too.
    let password = request.password;
    let stored = row.as_ref().map(|(_, hash)| hash.clone());
    let verified = tokio::task::spawn_blocking(move || match stored {
        Some(hash) => verify_password(&password, &hash),
        None => Ok(verify_unknown_user(&password)),
    })
    .await
    .map_err(|e| AppError::internal("Password verification failed").with_source(e))?
    .map_err(|e| AppError::internal("Password verification failed").with_source(e))?;

    let Some((id, _)) = row else {
        warn!(username = %request.username.trim(), "Login for unknown user");
        return Err(invalid());
    };
    if !verified {
        warn!(user_id = %id, "Login with wrong password");
        return Err(invalid());
    }

    let user_id = UserId(id);
    let purged = state.sessions.purge_expired(user_id).await?;
    let session = state.sessions.create(user_id).await?;
    info!(user_id = %user_id, purged, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
        access_token: session.token.clone(),
        token: session.token,
        token_type: "bearer",
        expires_at: session.expires_at,
    }))
}

/// Revoke the session the request was made with.
///
/// # Errors
///
/// 401 without a valid session.
pub async fn logout(
    session: SessionUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.sessions.revoke(&session.token).await?;
    info!(user_id = %session.user_id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Describe the session owner.
///
/// # Errors
///
/// 401 without a valid session.
pub async fn me(
    session: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, AppError> {
    let (username,): (String,) = sqlx::query_as("SELECT username FROM users WHERE id = $1")
        .bind(session.user_id.as_uuid())
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(MeResponse {
        id: *session.user_id.as_uuid(),
        username,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use proptest::prelude::*;

    #[test]
    fn test_valid_credentials_are_trimmed() {
        let username = validate_credentials("  alice  ", "wonderland").unwrap();
        assert_eq!(username, "alice");
    }

    #[test]
    fn test_short_username_rejected() {
        let err = validate_credentials("al", "wonderland").err();
        assert_eq!(err.map(|e| e.status()), Some(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[test]
    fn test_short_password_rejected() {
        let err = validate_credentials("alice", "12345").err();
        assert_eq!(err.map(|e| e.status()), Some(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[test]
    fn test_username_charset() {
        assert!(validate_credentials("alice.b_c-d", "wonderland").is_ok());
        assert!(validate_credentials("alice smith", "wonderland").is_err());
        assert!(validate_credentials("alice;drop", "wonderland").is_err());
    }

    proptest! {
        #[test]
        fn prop_well_formed_credentials_accepted(
            username in "[a-zA-Z0-9._-]{3,64}",
            password in ".{6,128}",
        ) {
            let normalized = validate_credentials(&username, &password);
            prop_assert!(normalized.is_ok());
            prop_assert_eq!(normalized.ok(), Some(username));
        }

        #[test]
        fn prop_short_passwords_rejected(
            username in "[a-z]{3,20}",
            password in ".{0,5}",
        ) {
            prop_assert!(validate_credentials(&username, &password).is_err());
        }

        #[test]
        fn prop_long_usernames_rejected(username in "[a-z]{65,100}") {
            prop_assert!(validate_credentials(&username, "wonderland").is_err());
        }
    }
}
