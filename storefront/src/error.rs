//! Startup errors.
//!
//! Anything that goes wrong before the listener starts serving is a
//! `BootstrapError`. None of them are retried: the binary returns the error
//! from `main` and the process exits.

use thiserror::Error;

/// Errors raised while bootstrapping the application.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A required environment variable is unset or blank.
    #[error("{var} environment variable is not set")]
    MissingConfig {
        /// Variable name
        var: &'static str,
    },

    /// An optional environment variable holds a value that does not parse.
    #[error("invalid value {value:?} for {var}")]
    InvalidConfig {
        /// Variable name
        var: &'static str,
        /// Raw value found in the environment
        value: String,
    },

    /// A builder step ran before the step it depends on.
    #[error("bootstrap step out of order: {0}")]
    OutOfOrder(&'static str),

    /// The tracing subscriber could not be installed.
    #[error("failed to initialise tracing: {0}")]
    Tracing(String),

    /// Connecting to the database or materializing the schema failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The TCP listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an I/O error.
    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_message_names_variable() {
        let err = BootstrapError::MissingConfig {
            var: "DATABASE_URL",
        };
        assert_eq!(err.to_string(), "DATABASE_URL environment variable is not set");
    }

    #[test]
    fn test_invalid_config_message_quotes_value() {
        let err = BootstrapError::InvalidConfig {
            var: "PORT",
            value: "eighty".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value \"eighty\" for PORT");
    }
}
