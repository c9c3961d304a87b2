//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                           - Health check
//!
//! # Install (OAuth)
//! GET    /auth/install?shop=               - Redirect to Shopify consent screen
//! GET    /auth/callback                    - Verify callback, exchange code
//!
//! # Discount configurations (connected shop from session)
//! GET    /discount                         - List configurations
//! POST   /discount/create                  - Create configuration + price rule
//! PUT    /discount/update/{id}             - Update configuration + price rule
//! DELETE /discount/delete/{id}             - Delete configuration + price rule
//!
//! # Webhooks (HMAC-signed by Shopify)
//! POST   /discount/webhook/orders/create   - Apply first matching discount
//! ```

mod auth;
mod discounts;
mod webhooks;

use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{create_session_layer, security_headers_middleware};
use crate::state::AppState;

pub use webhooks::{HMAC_HEADER, SHOP_DOMAIN_HEADER};

/// `{"message": ...}` response body.
#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Build the application router with sessions, security headers and request
/// tracing.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(discounts::router())
        .merge(webhooks::router())
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        #[allow(clippy::cast_possible_truncation)]
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// 302 redirect.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
