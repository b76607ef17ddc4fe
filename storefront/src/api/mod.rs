//! API endpoints for the storefront.
//!
//! Handlers are organized into four route groups, all mounted under `/api`:
//! - Products: the catalogue
//! - Cart: the caller's shopping cart
//! - Auth: signup, login and sessions
//! - Orders: checkout and order history

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use crate::server::state::AppState;
use axum::Router;

/// A named set of routes contributed to the API.
pub struct RouteGroup {
    /// Group name, for logging
    pub name: &'static str,
    /// Routes, relative to the API prefix
    pub router: Router<AppState>,
}

/// Every route group, in registration order.
#[must_use]
pub fn route_groups() -> Vec<RouteGroup> {
    vec![
        RouteGroup {
            name: "products",
            router: products::router(),
        },
        RouteGroup {
            name: "cart",
            router: cart::router(),
        },
        RouteGroup {
            name: "auth",
            router: auth::router(),
        },
        RouteGroup {
            name: "orders",
            router: orders::router(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_four_groups_registered() {
        let names: Vec<_> = route_groups().iter().map(|g| g.name).collect();
        assert_eq!(names, ["products", "cart", "auth", "orders"]);
    }
}
