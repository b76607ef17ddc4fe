//! Bearer-token sessions stored in `PostgreSQL`.
//!
//! A session token is 32 random bytes, URL-safe base64 encoded, handed to the
//! client once. Only its SHA-256 digest is stored, so a leaked `sessions`
//! table does not leak usable tokens.

use crate::types::UserId;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 32;

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Bearer token to return to the client
    pub token: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

/// Session persistence over the `sessions` table.
#[derive(Clone, Debug)]
pub struct SessionStore {
    pool: PgPool,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a store whose sessions live for `ttl_secs` seconds.
    #[must_use]
    pub fn new(pool: PgPool, ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self { pool, ttl }
    }

    /// Issue a new session for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub async fn create(&self, user_id: UserId) -> Result<IssuedSession, sqlx::Error> {
        let token = generate_token();
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(digest(&token))
            .bind(user_id.as_uuid())
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        debug!(user_id = %user_id, %expires_at, "Session created");
        Ok(IssuedSession { token, expires_at })
    }

    /// Resolve a token to its user, if the session exists and has not expired.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn validate(&self, token: &str) -> Result<Option<UserId>, sqlx::Error> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM sessions WHERE token = $1 AND expires_at > now()")
                .bind(digest(token))
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id,)| UserId(id)))
    }

    /// Delete a session. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    pub async fn revoke(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(digest(token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired sessions for one user.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    pub async fn purge_expired(&self, user_id: UserId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= now()")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Generate a random session token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Storage key for a token.
fn digest(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}
