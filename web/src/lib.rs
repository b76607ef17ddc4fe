//! Axum shell for the storefront backend.
//!
//! This crate holds the HTTP plumbing that is independent of any one
//! resource area, so the application crate only describes *what* it serves:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        storefront-web (this crate)      │  ← errors, extractors
//! │  - AppError → JSON error bodies         │  ← correlation ids, CORS
//! │  - Bearer / correlation extractors      │  ← static asset mounts
//! ├─────────────────────────────────────────┤
//! │        storefront (application)         │
//! │  - Config, schema, bootstrap            │  ← startup sequence
//! │  - products / cart / auth / orders      │  ← route groups
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use storefront_web::{cors::permissive_cors, static_files};
//!
//! let router = Router::new().route("/health", get(storefront_web::handlers::health_check));
//! let (router, _mounted) = static_files::mount_if_present(router, "/images", "images");
//! let app = router.layer(permissive_cors());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cors;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod static_files;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ApiPath, BearerToken, CorrelationId, CORRELATION_ID_HEADER};

