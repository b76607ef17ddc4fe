//! HTTP handlers that do not belong to a route group.

pub mod health;

pub use health::health_check;
