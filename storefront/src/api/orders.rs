//! Checkout and order history. All require a session.
//!
//! - POST /api/checkout - Place an order
//! - GET /api/orders - Caller's orders, newest first
//! - GET /api/orders/:id - One of the caller's orders
//!
//! Checkout takes its lines from the request body when it carries any, and
//! from the caller's cart otherwise. Unit prices are copied onto the order
//! lines, so later catalogue price changes do not rewrite history. The order
//! insert and the removal of the ordered products from the cart commit
//! together; cart lines for other products are left alone.

use crate::api::cart::validate_quantity;
use crate::auth::SessionUser;
use crate::server::state::AppState;
use crate::types::{Money, ProductId};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{BTreeMap, HashMap};
use storefront_web::{error::AppError, ApiPath, CorrelationId};
use tracing::info;
use uuid::Uuid;

/// Order status written at checkout.
pub const STATUS_PLACED: &str = "placed";

/// One requested order line.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    /// Product to order
    pub product_id: ProductId,
    /// How many
    pub quantity: i32,
}

/// Checkout body: shipping details plus optional explicit lines.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Recipient name
    pub full_name: String,
    /// Street address
    pub street: String,
    /// City
    pub city: String,
    /// State or region
    pub state: String,
    /// Postal code
    pub postal_code: String,
    /// Contact phone
    pub phone: String,
    /// Lines to order; empty means "the cart"
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
}

/// A line of a placed order.
#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    /// Product ID
    pub product_id: ProductId,
    /// Product name
    pub name: String,
    /// Quantity ordered
    pub quantity: i32,
    /// Unit price at checkout time
    pub unit_price: Money,
    /// `unit_price * quantity`
    pub subtotal: Money,
}

/// A placed order.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order ID
    pub id: Uuid,
    /// Status
    pub status: String,
    /// Recipient name
    pub full_name: String,
    /// Street address
    pub street: String,
    /// City
    pub city: String,
    /// State or region
    pub state: String,
    /// Postal code
    pub postal_code: String,
    /// Contact phone
    pub phone: String,
    /// Order total
    pub total: Money,
    /// Order lines
    pub items: Vec<OrderItemResponse>,
    /// Placement time
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    status: String,
    full_name: String,
    street: String,
    city: String,
    state: String,
    postal_code: String,
    phone: String,
    total_cents: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: ProductId,
    name: String,
    quantity: i32,
    unit_price_cents: i64,
}

#[derive(Debug, FromRow)]
struct PriceRow {
    id: ProductId,
    name: String,
    price_cents: i64,
}

/// A line priced against the catalogue.
struct PricedLine {
    product_id: ProductId,
    name: String,
    quantity: i32,
    unit_price: Money,
    subtotal: Money,
}

impl OrderItemRow {
    fn into_response(self) -> OrderItemResponse {
        let unit_price = Money::from_cents(self.unit_price_cents);
        OrderItemResponse {
            product_id: self.product_id,
            name: self.name,
            quantity: self.quantity,
            unit_price,
            subtotal: unit_price
                .checked_mul(i64::from(self.quantity))
                .unwrap_or(unit_price),
        }
    }
}

impl OrderRow {
    fn into_response(self, items: Vec<OrderItemResponse>) -> OrderResponse {
        OrderResponse {
            id: self.id,
            status: self.status,
            full_name: self.full_name,
            street: self.street,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
            phone: self.phone,
            total: Money::from_cents(self.total_cents),
            items,
            created_at: self.created_at,
        }
    }
}

/// Routes of the orders group.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
}

impl CheckoutRequest {
    /// Reject blank shipping fields, naming all of them at once.
    ///
    /// # Errors
    ///
    /// Returns 422 listing the blank fields.
    pub fn validate_shipping(&self) -> Result<(), AppError> {
        let blank: Vec<&str> = [
            ("full_name", &self.full_name),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if blank.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "missing shipping fields: {}",
                blank.join(", ")
            )))
        }
    }
}

/// Merge requested lines by product, summing quantities.
///
/// # Errors
///
/// Returns 422 if any quantity, before or after merging, is out of range.
pub fn merge_lines(lines: &[OrderLineRequest]) -> Result<BTreeMap<ProductId, i32>, AppError> {
    let mut merged = BTreeMap::new();
    for line in lines {
        validate_quantity(line.quantity)?;
        let quantity: &mut i32 = merged.entry(line.product_id).or_insert(0);
        *quantity = quantity.saturating_add(line.quantity);
        validate_quantity(*quantity)?;
    }
    Ok(merged)
}

/// Place an order.
///
/// ```bash
/// curl -X POST http://localhost:8000/api/checkout \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"full_name": "Alice", "street": "1 Main St", "city": "Springfield",
///        "state": "IL", "postal_code": "62701", "phone": "555-0100"}'
/// ```
///
/// # Errors
///
/// 422 for blank shipping fields, bad quantities or an empty order; 404 if a
/// line names an unknown product.
pub async fn checkout(
    CorrelationId(correlation_id): CorrelationId,
    session: SessionUser,
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    request.validate_shipping()?;
    let user_id = session.user_id;

    let mut tx = state.pool.begin().await?;

    // Cart checkout orders exactly the rows it deletes. Explicit lines clear
    // only their own products from the cart.
    let lines: BTreeMap<ProductId, i32> = if request.items.is_empty() {
        let rows: Vec<(ProductId, i32)> = sqlx::query_as(
            "DELETE FROM cart_items WHERE user_id = $1 RETURNING product_id, quantity",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;
        rows.into_iter().collect()
    } else {
        let lines = merge_lines(&request.items)?;
        let ordered: Vec<ProductId> = lines.keys().copied().collect();
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
            .bind(user_id.as_uuid())
            .bind(&ordered)
            .execute(&mut *tx)
            .await?;
        lines
    };

    if lines.is_empty() {
        return Err(AppError::validation("Cannot place an empty order"));
    }

    let ids: Vec<ProductId> = lines.keys().copied().collect();
    let prices: HashMap<ProductId, PriceRow> =
        sqlx::query_as::<_, PriceRow>("SELECT id, name, price_cents FROM products WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

    let priced = price_lines(&lines, prices)?;
    let total = priced
        .iter()
        .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.subtotal))
        .ok_or_else(|| AppError::validation("order total is too large"))?;

    let order_id = Uuid::new_v4();
    let created_at: DateTime<Utc> = sqlx::query_scalar(
        "INSERT INTO orders
            (id, user_id, full_name, street, city, state, postal_code, phone, total_cents, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING created_at",
    )
    .bind(order_id)
    .bind(user_id.as_uuid())
    .bind(request.full_name.trim())
    .bind(request.street.trim())
    .bind(request.city.trim())
    .bind(request.state.trim())
    .bind(request.postal_code.trim())
    .bind(request.phone.trim())
    .bind(total.cents())
    .bind(STATUS_PLACED)
    .fetch_one(&mut *tx)
    .await?;

    for line in &priced {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price.cents())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        %correlation_id,
        user_id = %user_id,
        order_id = %order_id,
        lines = priced.len(),
        total = %total,
        "Order placed"
    );

    let items = priced
        .into_iter()
        .map(|line| OrderItemResponse {
            product_id: line.product_id,
            name: line.name,
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal: line.subtotal,
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            id: order_id,
            status: STATUS_PLACED.to_owned(),
            full_name: request.full_name.trim().to_owned(),
            street: request.street.trim().to_owned(),
            city: request.city.trim().to_owned(),
            state: request.state.trim().to_owned(),
            postal_code: request.postal_code.trim().to_owned(),
            phone: request.phone.trim().to_owned(),
            total,
            items,
            created_at,
        }),
    ))
}

fn price_lines(
    lines: &BTreeMap<ProductId, i32>,
    mut prices: HashMap<ProductId, PriceRow>,
) -> Result<Vec<PricedLine>, AppError> {
    lines
        .iter()
        .map(|(&product_id, &quantity)| {
            let product = prices
                .remove(&product_id)
                .ok_or_else(|| AppError::not_found("Product", product_id))?;
            let unit_price = Money::from_cents(product.price_cents);
            let subtotal = unit_price
                .checked_mul(i64::from(quantity))
                .ok_or_else(|| AppError::validation("order total is too large"))?;
            Ok(PricedLine {
                product_id,
                name: product.name,
                quantity,
                unit_price,
                subtotal,
            })
        })
        .collect()
}

/// The caller's orders, newest first, with their lines.
///
/// # Errors
///
/// 401 without a valid session, 500 on database failure.
pub async fn list_orders(
    session: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders: Vec<OrderRow> = sqlx::query_as(
        "SELECT id, status, full_name, street, city, state, postal_code, phone, total_cents, created_at
         FROM orders
         WHERE user_id = $1
         ORDER BY created_at DESC, id",
    )
    .bind(session.user_id.as_uuid())
    .fetch_all(&state.pool)
    .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items = load_items(&state, &ids).await?;

    Ok(Json(
        orders
            .into_iter()
            .map(|order| {
                let lines = items.remove(&order.id).unwrap_or_default();
                order.into_response(lines)
            })
            .collect(),
    ))
}

/// One of the caller's orders.
///
/// Orders belonging to other users read as not found.
///
/// # Errors
///
/// 404 if the caller has no order with this id.
pub async fn get_order(
    session: SessionUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order: Option<OrderRow> = sqlx::query_as(
        "SELECT id, status, full_name, street, city, state, postal_code, phone, total_cents, created_at
         FROM orders
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(session.user_id.as_uuid())
    .fetch_optional(&state.pool)
    .await?;

    let order = order.ok_or_else(|| AppError::not_found("Order", id))?;
    let lines = load_items(&state, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();

    Ok(Json(order.into_response(lines)))
}

async fn load_items(
    state: &AppState,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItemResponse>>, sqlx::Error> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT oi.order_id, oi.product_id, p.name, oi.quantity, oi.unit_price_cents
         FROM order_items oi
         JOIN products p ON p.id = oi.product_id
         WHERE oi.order_id = ANY($1)
         ORDER BY oi.product_id",
    )
    .bind(order_ids)
    .fetch_all(&state.pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItemResponse>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row.into_response());
    }
    Ok(grouped)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(items: Vec<OrderLineRequest>) -> CheckoutRequest {
        CheckoutRequest {
            full_name: "Alice Liddell".into(),
            street: "1 Rabbit Hole".into(),
            city: "Oxford".into(),
            state: "OX".into(),
            postal_code: "OX1".into(),
            phone: "555-0100".into(),
            items,
        }
    }

    fn line(product_id: ProductId, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_complete_shipping_passes() {
        assert!(request(vec![]).validate_shipping().is_ok());
    }

    #[test]
    fn test_blank_shipping_fields_are_all_named() {
        let mut req = request(vec![]);
        req.city = "   ".into();
        req.phone = String::new();
        let err = req.validate_shipping().err().map(|e| e.message().to_owned());
        assert_eq!(err.as_deref(), Some("missing shipping fields: city, phone"));
    }

    #[test]
    fn test_merge_sums_duplicate_products() {
        let merged = merge_lines(&[line(2, 1), line(1, 3), line(2, 4)])
            .unwrap();
        assert_eq!(merged.into_iter().collect::<Vec<_>>(), vec![(1, 3), (2, 5)]);
    }

    #[test]
    fn test_merge_rejects_bad_quantities() {
        assert!(merge_lines(&[line(1, 0)]).is_err());
        assert!(merge_lines(&[line(1, 600), line(1, 600)]).is_err());
    }

    #[test]
    fn test_price_lines_snapshots_catalogue_price() {
        let lines = BTreeMap::from([(7, 3)]);
        let prices = HashMap::from([(
            7,
            PriceRow {
                id: 7,
                name: "Teapot".into(),
                price_cents: 1_250,
            },
        )]);
        let priced = price_lines(&lines, prices).unwrap();
        assert_eq!(priced.len(), 1);
        assert_eq!(priced[0].unit_price, Money::from_cents(1_250));
        assert_eq!(priced[0].subtotal, Money::from_cents(3_750));
    }

    #[test]
    fn test_price_lines_unknown_product_is_404() {
        let lines = BTreeMap::from([(7, 1)]);
        let err = price_lines(&lines, HashMap::new()).err();
        assert_eq!(err.map(|e| e.status()), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_checkout_items_default_to_empty() {
        let req: CheckoutRequest = serde_json::from_str(
            r#"{"full_name":"A","street":"B","city":"C","state":"D","postal_code":"E","phone":"F"}"#,
        )
        .unwrap();
        assert!(req.items.is_empty());
    }
}
