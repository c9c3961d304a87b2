//! Shopify webhook receivers.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use secrecy::ExposeSecret;
use tracing::{instrument, warn};

use autodiscount_core::{OrderEvent, ShopDomain};

use crate::config::ORDERS_CREATE_WEBHOOK_PATH;
use crate::error::AppError;
use crate::services::signature;
use crate::state::AppState;

use super::MessageResponse;

/// Base64 HMAC-SHA256 of the raw body.
pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";

/// Shop the event belongs to.
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

pub fn router() -> Router<AppState> {
    Router::new().route(ORDERS_CREATE_WEBHOOK_PATH, post(orders_create))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /discount/webhook/orders/create - Apply a discount to a new order.
///
/// The body is taken as raw bytes: the signature covers exactly what Shopify
/// sent, and nothing is parsed until it verifies.
#[instrument(skip_all)]
async fn orders_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let presented = header(&headers, HMAC_HEADER).ok_or_else(|| {
        warn!("Webhook without HMAC header");
        AppError::WebhookUnauthorized
    })?;
    let secret = state.config().shopify.webhook_secret.expose_secret();
    if !signature::verify_webhook_body(secret.as_bytes(), &body, presented) {
        warn!("Webhook HMAC validation failed");
        return Err(AppError::WebhookUnauthorized);
    }

    let shop = header(&headers, SHOP_DOMAIN_HEADER)
        .ok_or_else(|| AppError::BadRequest("Missing shop domain header".to_string()))
        .and_then(|raw| {
            ShopDomain::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
        })?;
    let order: OrderEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid order payload: {e}")))?;

    let outcome = state.orders().handle_order_created(&shop, &order).await?;

    Ok(Json(MessageResponse {
        message: outcome.message(),
    }))
}
