//! Shopping cart endpoints. All require a session.
//!
//! - GET /api/cart - Current cart lines
//! - POST /api/cart/add - Add a product (quantities accumulate)
//! - POST /api/cart/remove - Remove a product (JSON body)
//! - DELETE /api/cart/remove/:product_id - Remove a product (path)
//!
//! Every mutation answers with the updated cart.

use crate::auth::SessionUser;
use crate::server::state::AppState;
use crate::types::{Money, ProductId, UserId};
use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use storefront_web::{error::AppError, ApiPath};
use tracing::debug;

/// Largest quantity accepted in a single add or order line.
pub const MAX_LINE_QUANTITY: i32 = 1_000;

#[derive(Debug, FromRow)]
struct CartRow {
    product_id: ProductId,
    name: String,
    price_cents: i64,
    image: Option<String>,
    quantity: i32,
}

/// One line of the cart.
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    /// Product ID
    pub product_id: ProductId,
    /// Product name
    pub name: String,
    /// Unit price
    pub price: Money,
    /// Product image
    pub image: Option<String>,
    /// Quantity in the cart
    pub quantity: i32,
}

impl From<CartRow> for CartItemResponse {
    fn from(row: CartRow) -> Self {
        Self {
            product_id: row.product_id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            image: row.image,
            quantity: row.quantity,
        }
    }
}

/// Request to add a product to the cart.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    /// Product to add
    pub product_id: ProductId,
    /// How many (default: 1)
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Request to remove a product from the cart.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    /// Product to remove
    pub product_id: ProductId,
}

/// Routes of the cart group.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/remove", post(remove_from_cart))
        .route("/cart/remove/:product_id", delete(remove_from_cart_by_path))
}

/// Validate a requested line quantity.
///
/// # Errors
///
/// Returns 422 when the quantity is outside `1..=MAX_LINE_QUANTITY`.
pub fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )))
    }
}

/// Load the cart of `user_id`, ordered by when lines were first added.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn load_cart<'e, E>(
    executor: E,
    user_id: UserId,
) -> Result<Vec<CartItemResponse>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<CartRow> = sqlx::query_as(
        "SELECT c.product_id, p.name, p.price_cents, p.image, c.quantity
         FROM cart_items c
         JOIN products p ON p.id = c.product_id
         WHERE c.user_id = $1
         ORDER BY c.added_at, c.product_id",
    )
    .bind(user_id.as_uuid())
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(CartItemResponse::from).collect())
}

/// Current cart of the caller.
///
/// # Errors
///
/// 401 without a valid session, 500 on database failure.
pub async fn get_cart(
    session: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CartItemResponse>>, AppError> {
    Ok(Json(load_cart(&state.pool, session.user_id).await?))
}

/// Add a product to the caller's cart.
///
/// ```bash
/// curl -X POST http://localhost:8000/api/cart/add \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"product_id": 1, "quantity": 2}'
/// ```
///
/// # Errors
///
/// 422 for an invalid quantity, 404 for an unknown product.
pub async fn add_to_cart(
    session: SessionUser,
    State(state): State<AppState>,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<Vec<CartItemResponse>>, AppError> {
    validate_quantity(request.quantity)?;

    let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(request.product_id)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::not_found("Product", request.product_id));
    }

    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity)
         VALUES ($1, $2, $3)
         ON CONFLICT (user_id, product_id)
         DO UPDATE SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $4)",
    )
    .bind(session.user_id.as_uuid())
    .bind(request.product_id)
    .bind(request.quantity)
    .bind(MAX_LINE_QUANTITY)
    .execute(&state.pool)
    .await?;

    debug!(
        user_id = %session.user_id,
        product_id = request.product_id,
        quantity = request.quantity,
        "Added to cart"
    );

    Ok(Json(load_cart(&state.pool, session.user_id).await?))
}

/// Remove a product from the caller's cart (JSON body form).
///
/// Removing a product that is not in the cart is not an error.
///
/// # Errors
///
/// 401 without a valid session, 500 on database failure.
pub async fn remove_from_cart(
    session: SessionUser,
    State(state): State<AppState>,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<Vec<CartItemResponse>>, AppError> {
    remove_line(&state, session.user_id, request.product_id).await
}

/// Remove a product from the caller's cart (path form).
///
/// # Errors
///
/// 401 without a valid session, 500 on database failure.
pub async fn remove_from_cart_by_path(
    session: SessionUser,
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<Vec<CartItemResponse>>, AppError> {
    remove_line(&state, session.user_id, product_id).await
}

async fn remove_line(
    state: &AppState,
    user_id: UserId,
    product_id: ProductId,
) -> Result<Json<Vec<CartItemResponse>>, AppError> {
    let removed = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id.as_uuid())
        .bind(product_id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    debug!(user_id = %user_id, product_id, removed, "Removed from cart");

    Ok(Json(load_cart(&state.pool, user_id).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_add_request_defaults_to_one() {
        let request: AddToCartRequest =
            serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(request.product_id, 4);
        assert_eq!(request.quantity, 1);
    }
}
