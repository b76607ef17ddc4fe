//! Product catalogue endpoints.
//!
//! - GET /api/products - List all products
//! - GET /api/products/:id - Get one product

use crate::server::state::AppState;
use crate::types::{Money, ProductId};
use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::FromRow;
use storefront_web::{error::AppError, ApiPath};

/// Row shape of the `products` table.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price_cents: i64,
    image: Option<String>,
}

/// Product as returned to clients.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// Product ID
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Unit price
    pub price: Money,
    /// Image URL (usually under `/images`)
    pub image: Option<String>,
}

impl From<ProductRow> for ProductResponse {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: Money::from_cents(row.price_cents),
            image: row.image,
        }
    }
}

/// Routes of the products group.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

/// List every product, ordered by id.
///
/// ```bash
/// curl http://localhost:8000/api/products
/// ```
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let rows: Vec<ProductRow> = sqlx::query_as(
        "SELECT id, name, description, price_cents, image FROM products ORDER BY id",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows.into_iter().map(ProductResponse::from).collect()))
}

/// Get a single product.
///
/// # Errors
///
/// Returns 404 if no product has this id.
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductResponse>, AppError> {
    let row: Option<ProductRow> = sqlx::query_as(
        "SELECT id, name, description, price_cents, image FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;

    row.map(|r| Json(r.into()))
        .ok_or_else(|| AppError::not_found("Product", id))
}
