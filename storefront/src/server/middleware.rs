//! Request context middleware.
//!
//! Each request runs inside an `http_request` span carrying its correlation
//! id and the storefront area it targets. The id is the one sent in
//! `X-Correlation-ID` when that parses as a UUID, otherwise a fresh v4; it is
//! stored in the request extensions for [`CorrelationId`] and echoed on the
//! response.
//!
//! [`CorrelationId`]: storefront_web::CorrelationId

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use storefront_web::CORRELATION_ID_HEADER;
use tracing::Instrument;
use uuid::Uuid;

/// Area of the storefront a request path belongs to.
///
/// Route groups are named after the resource they serve; auth endpoints sit
/// directly under `/api`, so they are classified by their leaf segment.
#[must_use]
pub fn request_area(path: &str) -> &'static str {
    let mut segments = path.trim_start_matches('/').split('/');
    match segments.next() {
        None | Some("") => "root",
        Some("api") => match segments.next() {
            Some("products") => "products",
            Some("cart") => "cart",
            Some("checkout" | "orders") => "orders",
            Some("signup" | "login" | "logout" | "me") => "auth",
            _ => "api",
        },
        Some("images") => "images",
        Some("health" | "ready") => "probe",
        Some(_) => "other",
    }
}

/// Assign the correlation id and open the request span.
///
/// Install with `axum::middleware::from_fn(request_context)`.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    req.extensions_mut().insert(correlation_id);

    // Query strings stay out of the span; login bodies never reach it.
    let span = tracing::info_span!(
        "http_request",
        %correlation_id,
        method = %req.method(),
        path = %req.uri().path(),
        area = request_area(req.uri().path()),
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn, routing::get, Router};
    use storefront_web::CorrelationId;
    use tower::ServiceExt;

    async fn echo(CorrelationId(id): CorrelationId) -> String {
        id.to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/api/cart", get(echo))
            .layer(from_fn(request_context))
    }

    fn get_cart(correlation: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/cart");
        if let Some(value) = correlation {
            builder = builder.header(CORRELATION_ID_HEADER, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_request_area() {
        assert_eq!(request_area("/"), "root");
        assert_eq!(request_area("/api/products/3"), "products");
        assert_eq!(request_area("/api/cart/remove/3"), "cart");
        assert_eq!(request_area("/api/checkout"), "orders");
        assert_eq!(request_area("/api/orders"), "orders");
        assert_eq!(request_area("/api/login"), "auth");
        assert_eq!(request_area("/api/unknown"), "api");
        assert_eq!(request_area("/images/mug.png"), "images");
        assert_eq!(request_area("/ready"), "probe");
        assert_eq!(request_area("/favicon.ico"), "other");
    }

    #[tokio::test]
    async fn test_handler_and_response_share_generated_id() {
        let response = app().oneshot(get_cart(None)).await.unwrap();

        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(body_text(response).await, header);
    }

    #[tokio::test]
    async fn test_client_id_is_kept() {
        let sent = Uuid::new_v4().to_string();
        let response = app().oneshot(get_cart(Some(&sent))).await.unwrap();

        assert_eq!(response.headers()[CORRELATION_ID_HEADER], sent.as_str());
        assert_eq!(body_text(response).await, sent);
    }

    #[tokio::test]
    async fn test_malformed_id_is_replaced() {
        let response = app().oneshot(get_cart(Some("order-42"))).await.unwrap();

        let header = response.headers()[CORRELATION_ID_HEADER].to_str().unwrap();
        assert!(Uuid::parse_str(header).is_ok());
    }
}
