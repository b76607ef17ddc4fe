//! Authentication extractor.
//!
//! ```rust,ignore
//! async fn get_cart(session: SessionUser, State(state): State<AppState>) -> ... {
//!     // session.user_id is a valid, unexpired session owner
//! }
//! ```

use crate::auth::session::SessionStore;
use crate::types::UserId;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use storefront_web::{error::AppError, extractors::BearerToken};

/// Authenticated session user.
///
/// Resolves the bearer token against the session store; rejects with 401 when
/// the header is missing or the session is unknown or expired.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The authenticated user ID
    pub user_id: UserId,
    /// The bearer token the request carried
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        let sessions = SessionStore::from_ref(state);
        let user_id = sessions
            .validate(&token)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;

        Ok(Self { user_id, token })
    }
}
