//! Authentication for the storefront.
//!
//! Username/password accounts with Argon2id hashes, and opaque bearer-token
//! sessions stored in `PostgreSQL`.

pub mod middleware;
pub mod password;
pub mod session;

pub use middleware::SessionUser;
pub use password::{hash_password, verify_password, verify_unknown_user, PasswordError};
pub use session::{generate_token, IssuedSession, SessionStore};
