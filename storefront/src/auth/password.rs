//! Password hashing.
//!
//! Passwords are hashed with Argon2id using the crate defaults and a random
//! salt, and stored as PHC strings (`$argon2id$v=19$...`), so parameters can be
//! raised later without invalidating existing hashes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::LazyLock;
use thiserror::Error;

// Stand-in hash for logins naming no account.
static UNKNOWN_USER_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no account has this password").ok());

/// Password hashing errors.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// The hasher rejected its input or parameters.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// A stored hash is not a valid PHC string.
    #[error("stored password hash is malformed")]
    MalformedHash,
}

/// Hash a password into a PHC string.
///
/// # Errors
///
/// Returns [`PasswordError::Hashing`] if Argon2 fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// A mismatch is `Ok(false)`, not an error.
///
/// # Errors
///
/// Returns [`PasswordError::MalformedHash`] if `stored` cannot be parsed, or
/// [`PasswordError::Hashing`] for any other verifier failure.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|_| PasswordError::MalformedHash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hashing(e.to_string())),
    }
}

/// Spend one full verification on a login that names no account.
///
/// Always `false`; the work done matches a wrong-password check, so response
/// time does not reveal whether the username exists.
pub fn verify_unknown_user(password: &str) -> bool {
    if let Some(hash) = UNKNOWN_USER_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_user_never_verifies() {
        let stand_in = UNKNOWN_USER_HASH.as_deref().unwrap();
        assert!(PasswordHash::new(stand_in).is_ok());

        assert!(!verify_unknown_user("correct horse"));
        assert!(!verify_unknown_user("no account has this password"));
    }

    #[test]
    fn test_malformed_hash() {
        assert!(matches!(
            verify_password("anything", "plaintext"),
            Err(PasswordError::MalformedHash)
        ));
    }
}
