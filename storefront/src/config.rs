//! Configuration management for the storefront backend.
//!
//! Everything is read from environment variables. `DATABASE_URL` is the only
//! required value; every other setting has a default.

use crate::error::BootstrapError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Name of the required connection-string variable.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// URL prefix the images directory is mounted under.
pub const IMAGES_MOUNT_PATH: &str = "/images";

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,storefront=debug,sqlx=warn";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Static asset configuration
    pub assets: AssetsConfig,
    /// Session configuration
    pub auth: AuthConfig,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Create missing tables and indexes at startup
    pub auto_create_schema: bool,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter (trace, debug, info, warn, error or a full directive)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Static asset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory holding product images
    pub images_dir: PathBuf,
    /// URL prefix for the images directory
    pub mount_path: String,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default: 1 day)
    pub session_ttl: u64,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// - [`BootstrapError::MissingConfig`] if `DATABASE_URL` is unset or blank
    /// - [`BootstrapError::InvalidConfig`] if an optional value does not parse
    pub fn from_env() -> Result<Self, BootstrapError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// [`Config::from_env`] delegates here; tests pass a map instead of
    /// mutating the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BootstrapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(DATABASE_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or(BootstrapError::MissingConfig {
                var: DATABASE_URL_VAR,
            })?;

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                connect_timeout: parse_or(&lookup, "DATABASE_CONNECT_TIMEOUT", 30)?,
                auto_create_schema: parse_or(&lookup, "AUTO_CREATE_SCHEMA", true)?,
            },
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8000)?,
                log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                shutdown_timeout: parse_or(&lookup, "SHUTDOWN_TIMEOUT", 30)?,
            },
            assets: AssetsConfig {
                images_dir: lookup("IMAGES_DIR").map_or_else(|| PathBuf::from("images"), PathBuf::from),
                mount_path: IMAGES_MOUNT_PATH.to_string(),
            },
            auth: AuthConfig {
                session_ttl: parse_or(&lookup, "SESSION_TTL", 86_400)?, // 1 day
            },
        })
    }

    /// Address string for the TCP listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DatabaseConfig {
    /// Connection URL with the password replaced by `***`, for logging.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        redact_password(&self.url)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, BootstrapError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| BootstrapError::InvalidConfig {
            var,
            value: raw.clone(),
        }),
    }
}

fn redact_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
        return url.to_string();
    };
    let Some(at) = url[scheme_end..].find('@').map(|i| i + scheme_end) else {
        return url.to_string();
    };
    match url[scheme_end..at].find(':') {
        Some(colon) => format!("{}***{}", &url[..=scheme_end + colon], &url[at..]),
        None => url.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_database_url_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::MissingConfig { var: "DATABASE_URL" }
        ));
    }

    #[test]
    fn test_blank_database_url_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, BootstrapError::MissingConfig { .. }));
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://db/shop")])).unwrap();

        assert_eq!(config.database.url, "postgres://db/shop");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.auto_create_schema);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.assets.images_dir, PathBuf::from("images"));
        assert_eq!(config.assets.mount_path, "/images");
        assert_eq!(config.auth.session_ttl, 86_400);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("PORT", "9000"),
            ("HOST", "127.0.0.1"),
            ("AUTO_CREATE_SCHEMA", "false"),
            ("IMAGES_DIR", "/srv/images"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert!(!config.database.auto_create_schema);
        assert_eq!(config.assets.images_dir, PathBuf::from("/srv/images"));
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::InvalidConfig { var: "PORT", .. }
        ));
    }

    #[test]
    fn test_redacted_url_hides_password() {
        assert_eq!(
            redact_password("postgres://shop:s3cret@db:5432/shop"),
            "postgres://shop:***@db:5432/shop"
        );
        assert_eq!(
            redact_password("postgres://shop@db/shop"),
            "postgres://shop@db/shop"
        );
        assert_eq!(redact_password("not a url"), "not a url");
    }
}
