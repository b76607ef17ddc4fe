//! Bootstrap components for application initialization.
//!
//! Startup is a fixed sequence, each step depending on the one before:
//!
//! 1. Tracing and configuration (`DATABASE_URL` is required)
//! 2. Connection pool
//! 3. Create-if-absent schema (unless `AUTO_CREATE_SCHEMA=false`)
//! 4. Router: CORS, `/images` when present, the route groups, `GET /`
//! 5. Bound listener
//!
//! # Modules
//!
//! - **`resources`**: Infrastructure setup (database pool, schema)
//! - **`builder`**: The step-by-step `ApplicationBuilder`

pub mod builder;
pub mod resources;

pub use builder::ApplicationBuilder;
pub use resources::ResourceManager;
