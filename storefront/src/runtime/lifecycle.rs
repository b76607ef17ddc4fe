//! Application lifecycle management and graceful shutdown.
//!
//! 1. **Startup**: the listener is already bound by the builder
//! 2. **Runtime**: serve HTTP until a shutdown signal arrives
//! 3. **Shutdown**: stop accepting, drain in-flight requests (bounded by
//!    `SHUTDOWN_TIMEOUT`), then close the pool
//!
//! # Example
//!
//! ```rust,ignore
//! let app = ApplicationBuilder::new()
//!     .with_tracing()?
//!     .with_config_from_env()?
//!     .with_resources().await?
//!     .with_schema().await?
//!     .build().await?;
//!
//! app.run().await?;
//! ```

use crate::config::Config;
use crate::error::BootstrapError;
use sqlx::PgPool;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Fully bootstrapped application, ready to serve.
pub struct Application {
    /// TCP listener for HTTP server
    listener: TcpListener,

    /// Axum router with all HTTP routes
    app: axum::Router,

    /// Pool closed on shutdown
    pool: PgPool,

    /// Application configuration
    config: Arc<Config>,
}

impl Application {
    /// Create a new application instance.
    #[must_use]
    pub const fn new(
        listener: TcpListener,
        app: axum::Router,
        pool: PgPool,
        config: Arc<Config>,
    ) -> Self {
        Self {
            listener,
            app,
            pool,
            config,
        }
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the socket address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Server`] if the server fails.
    pub async fn run(self) -> Result<(), BootstrapError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `signal` completes.
    ///
    /// After the signal, in-flight requests get `SHUTDOWN_TIMEOUT` seconds to
    /// finish before the server is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Server`] if the server fails.
    pub async fn run_until<F>(self, signal: F) -> Result<(), BootstrapError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            listener,
            app,
            pool,
            config,
        } = self;

        let address = listener
            .local_addr()
            .map_or_else(|_| config.bind_address(), |a| a.to_string());
        info!(address = %address, "HTTP server listening for requests");

        let triggered = Arc::new(Notify::new());
        let notify = Arc::clone(&triggered);
        let server = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    signal.await;
                    notify.notify_one();
                })
                .await
        };

        let drain_timeout = Duration::from_secs(config.server.shutdown_timeout);
        let deadline = async {
            triggered.notified().await;
            info!("Shutdown signal received, draining in-flight requests...");
            tokio::time::sleep(drain_timeout).await;
        };

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!(error = %e, "HTTP server failed");
                    pool.close().await;
                    return Err(BootstrapError::Server(e));
                }
            }
            () = deadline => {
                warn!(
                    timeout_secs = drain_timeout.as_secs(),
                    "Shutdown timed out, dropping open connections"
                );
            }
        }

        info!("HTTP server stopped, closing database pool");
        pool.close().await;

        info!("Graceful shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// If a handler cannot be installed, that source is logged and ignored.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
