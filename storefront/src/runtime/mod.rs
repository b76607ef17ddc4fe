//! Runtime components for the storefront.
//!
//! - **`lifecycle`**: serving, signal handling and graceful shutdown

pub mod lifecycle;

pub use lifecycle::Application;
