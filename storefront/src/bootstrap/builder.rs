//! Declarative application builder API.
//!
//! The builder follows a **declarative, step-by-step** initialization pattern:
//! 1. Configure (tracing, config)
//! 2. Initialize infrastructure (database pool)
//! 3. Ensure the schema exists
//! 4. Build HTTP server (routes, state, listener)
//!
//! Each step returns `Result`, and a step called before the step it depends
//! on fails with [`BootstrapError::OutOfOrder`] instead of panicking.
//!
//! # Example
//!
//! ```rust,ignore
//! ApplicationBuilder::new()
//!     .with_tracing()?
//!     .with_config_from_env()?
//!     .with_resources().await?
//!     .with_schema().await?
//!     .build().await?
//!     .run().await?;
//! ```

use crate::bootstrap::ResourceManager;
use crate::config::{Config, DEFAULT_LOG_FILTER};
use crate::error::BootstrapError;
use crate::runtime::Application;
use crate::server::{build_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builder for creating a fully configured storefront application.
///
/// # Type-State Pattern
///
/// The builder uses **Option fields** to track which components have been
/// initialized, giving runtime validation that steps run in order.
#[derive(Default)]
pub struct ApplicationBuilder {
    /// Application configuration
    config: Option<Arc<Config>>,

    /// Infrastructure resources (database pool)
    resources: Option<ResourceManager>,

    /// Whether the schema step has run
    schema_checked: bool,
}

impl ApplicationBuilder {
    /// Create a new application builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set application configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::MissingConfig`] when `DATABASE_URL` is not
    /// set, or [`BootstrapError::InvalidConfig`] for an unparsable value.
    pub fn with_config_from_env(self) -> Result<Self, BootstrapError> {
        match Config::from_env() {
            Ok(config) => {
                info!(
                    database = %config.database.redacted_url(),
                    address = %config.bind_address(),
                    auto_create_schema = config.database.auto_create_schema,
                    images_dir = %config.assets.images_dir.display(),
                    "Configuration loaded"
                );
                Ok(self.with_config(config))
            }
            Err(e) => {
                error!(error = %e, "Configuration error");
                Err(e)
            }
        }
    }

    /// Setup tracing and logging.
    ///
    /// The filter comes from the config's log level when config is already
    /// set, otherwise from `RUST_LOG`, otherwise [`DEFAULT_LOG_FILTER`].
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Tracing`] if a global subscriber is already
    /// installed or the filter does not parse.
    pub fn with_tracing(self) -> Result<Self, BootstrapError> {
        let filter = match &self.config {
            Some(config) => EnvFilter::try_new(&config.server.log_level)
                .map_err(|e| BootstrapError::Tracing(e.to_string()))?,
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| BootstrapError::Tracing(e.to_string()))?;

        Ok(self)
    }

    /// Connect the database pool.
    ///
    /// # Errors
    ///
    /// - [`BootstrapError::OutOfOrder`] if config is not set
    /// - [`BootstrapError::Database`] if the database is unreachable
    pub async fn with_resources(mut self) -> Result<Self, BootstrapError> {
        let config = self
            .config
            .clone()
            .ok_or(BootstrapError::OutOfOrder("config must be set before connecting the database"))?;

        self.resources = Some(ResourceManager::from_config(config).await?);
        Ok(self)
    }

    /// Create missing tables and indexes (skipped when
    /// `AUTO_CREATE_SCHEMA=false`).
    ///
    /// # Errors
    ///
    /// - [`BootstrapError::OutOfOrder`] if the database is not connected
    /// - [`BootstrapError::Database`] if materialization fails
    pub async fn with_schema(mut self) -> Result<Self, BootstrapError> {
        let resources = self
            .resources
            .as_ref()
            .ok_or(BootstrapError::OutOfOrder("database must be connected before the schema step"))?;

        let applied = resources.ensure_schema().await?;
        info!(statements = applied, "Schema step complete");

        self.schema_checked = true;
        Ok(self)
    }

    /// Build the router and bind the listener.
    ///
    /// # Errors
    ///
    /// - [`BootstrapError::OutOfOrder`] if an earlier step was skipped
    /// - [`BootstrapError::Bind`] if the address cannot be bound
    pub async fn build(self) -> Result<Application, BootstrapError> {
        let resources = self
            .resources
            .ok_or(BootstrapError::OutOfOrder("database must be connected before build"))?;
        if !self.schema_checked {
            return Err(BootstrapError::OutOfOrder("schema step must run before build"));
        }

        let config = resources.config;
        let router = build_router(AppState::new(resources.pool.clone(), Arc::clone(&config)));

        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| BootstrapError::Bind {
                address: address.clone(),
                source,
            })?;

        info!(address = %address, "Listener bound");
        Ok(Application::new(listener, router, resources.pool, config))
    }

    /// Run every remaining startup step against the process environment.
    ///
    /// Loads configuration from the environment unless one was already
    /// supplied, then connects, ensures the schema and binds.
    ///
    /// # Errors
    ///
    /// The first error of any step; nothing after it runs.
    pub async fn bootstrap(self) -> Result<Application, BootstrapError> {
        let builder = if self.config.is_some() {
            self
        } else {
            self.with_config_from_env()?
        };

        builder.with_resources().await?.with_schema().await?.build().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> Config {
        let vars = HashMap::from([("DATABASE_URL", "postgres://nobody@127.0.0.1:1/none")]);
        Config::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_resources_before_config_is_out_of_order() {
        let err = ApplicationBuilder::new().with_resources().await.err();
        assert!(matches!(err, Some(BootstrapError::OutOfOrder(_))));
    }

    #[tokio::test]
    async fn test_schema_before_resources_is_out_of_order() {
        let err = ApplicationBuilder::new()
            .with_config(config())
            .with_schema()
            .await
            .err();
        assert!(matches!(err, Some(BootstrapError::OutOfOrder(_))));
    }

    #[tokio::test]
    async fn test_build_without_resources_is_out_of_order() {
        let err = ApplicationBuilder::new().with_config(config()).build().await.err();
        assert!(matches!(err, Some(BootstrapError::OutOfOrder(_))));
    }
}
