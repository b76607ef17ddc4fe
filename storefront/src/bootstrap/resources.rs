//! Resource management for infrastructure setup.
//!
//! The storefront has one piece of infrastructure: a `PostgreSQL` pool shared
//! by every route group. `ResourceManager` owns it together with the
//! configuration it was built from.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = Config::from_env()?;
//! let resources = ResourceManager::from_config(Arc::new(config)).await?;
//! resources.ensure_schema().await?;
//! ```

use crate::config::{Config, DatabaseConfig};
use crate::error::BootstrapError;
use crate::schema;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Infrastructure resources owned by the application.
#[derive(Clone)]
pub struct ResourceManager {
    /// Application configuration
    pub config: Arc<Config>,

    /// Shared connection pool
    pub pool: PgPool,
}

impl ResourceManager {
    /// Connect the pool described by `config`.
    ///
    /// The first connection is opened eagerly, so an unreachable database
    /// fails startup instead of the first request.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Database`] if no connection can be opened
    /// within the configured timeout.
    pub async fn from_config(config: Arc<Config>) -> Result<Self, BootstrapError> {
        let pool = connect_pool(&config.database).await?;
        Ok(Self { config, pool })
    }

    /// Create missing tables and indexes, if enabled.
    ///
    /// Returns the number of statements applied (0 when disabled).
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Database`] if materialization fails.
    pub async fn ensure_schema(&self) -> Result<usize, BootstrapError> {
        if !self.config.database.auto_create_schema {
            info!("AUTO_CREATE_SCHEMA disabled, expecting an existing schema");
            return Ok(0);
        }

        warn!("Creating missing tables at startup; use migrations for managed deployments");
        Ok(schema::materialize(&self.pool).await?)
    }
}

/// Open a pool against `database.url`.
///
/// # Errors
///
/// Returns [`BootstrapError::Database`] if the connection fails.
pub async fn connect_pool(database: &DatabaseConfig) -> Result<PgPool, BootstrapError> {
    info!(
        url = %database.redacted_url(),
        max_connections = database.max_connections,
        "Connecting to PostgreSQL..."
    );

    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(database.connect_timeout))
        .connect(&database.url)
        .await?;

    info!("Database connection established");
    Ok(pool)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_disabled_schema_step_runs_nothing() {
        let vars = HashMap::from([
            ("DATABASE_URL", "postgres://nobody@127.0.0.1:1/none"),
            ("AUTO_CREATE_SCHEMA", "false"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();

        // Any statement against this pool would fail to connect.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(&config.database.url)
            .unwrap();
        let resources = ResourceManager {
            config: Arc::new(config),
            pool,
        };

        assert_eq!(resources.ensure_schema().await.unwrap(), 0);
    }
}
