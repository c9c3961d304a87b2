//! Install flow: consent redirect, OAuth callback, webhook registration.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use autodiscount_integration_tests::{FakeCall, SHOP, TestApp, signed_callback_uri};

#[tokio::test]
async fn test_health() {
    let mut app = TestApp::new();
    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_install_redirects_to_consent_screen() {
    let mut app = TestApp::new();
    let response = app.get(&format!("/auth/install?shop={SHOP}")).await;

    assert_eq!(response.status, StatusCode::FOUND);
    let location = response.location().unwrap();
    assert!(location.starts_with("https://demo-store.myshopify.com/admin/oauth/authorize?"));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("scope=write_discounts%2Cwrite_orders"));
    assert!(response.headers.contains_key("set-cookie"));
}

#[tokio::test]
async fn test_install_requires_valid_shop() {
    let mut app = TestApp::new();

    let missing = app.get("/auth/install").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let foreign = app.get("/auth/install?shop=attacker.example.com").await;
    assert_eq!(foreign.status, StatusCode::BAD_REQUEST);
    assert!(foreign.location().is_none());
}

#[tokio::test]
async fn test_install_completes_even_when_webhook_registration_fails() {
    let mut app = TestApp::new();
    app.shopify.fail(FakeCall::RegisterWebhook);

    let response = app.install(SHOP).await;

    assert_eq!(response.status, StatusCode::FOUND, "{}", response.text());
    assert_eq!(response.location(), Some("/discount"));
    assert_eq!(app.shopify.count(FakeCall::ExchangeCode), 1);
    assert_eq!(app.shopify.count(FakeCall::RegisterWebhook), 1);

    let list = app.get("/discount").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.json(), serde_json::json!([]));
}

#[tokio::test]
async fn test_callback_with_wrong_state_is_rejected_before_token_exchange() {
    let mut app = TestApp::new();
    let state = app.start_install(SHOP).await;
    let rest = state.get(1..).unwrap();
    let forged = if state.starts_with('0') {
        format!("1{rest}")
    } else {
        format!("0{rest}")
    };

    let response = app.get(&signed_callback_uri(SHOP, &forged, "auth-code")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.shopify.count(FakeCall::ExchangeCode), 0);
}

#[tokio::test]
async fn test_callback_without_session_state_is_rejected() {
    let mut app = TestApp::new();
    let state = app.start_install(SHOP).await;

    // Different browser: never saw the install redirect.
    let mut other = app.new_browser();
    let response = other.get(&signed_callback_uri(SHOP, &state, "auth-code")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.shopify.count(FakeCall::ExchangeCode), 0);
}

#[tokio::test]
async fn test_callback_with_tampered_query_is_rejected() {
    let mut app = TestApp::new();
    let state = app.start_install(SHOP).await;
    let uri = signed_callback_uri(SHOP, &state, "auth-code").replace("code=auth-code", "code=stolen");

    let response = app.get(&uri).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "HMAC validation failed");
    assert_eq!(app.shopify.count(FakeCall::ExchangeCode), 0);
}

#[tokio::test]
async fn test_callback_state_is_single_use() {
    let mut app = TestApp::new();
    let state = app.start_install(SHOP).await;
    let uri = signed_callback_uri(SHOP, &state, "auth-code");

    let first = app.get(&uri).await;
    assert_eq!(first.status, StatusCode::FOUND);

    let replay = app.get(&uri).await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.shopify.count(FakeCall::ExchangeCode), 1);
}

#[tokio::test]
async fn test_token_exchange_failure_leaves_shop_unauthorized() {
    let mut app = TestApp::new();
    app.shopify.fail(FakeCall::ExchangeCode);

    let response = app.install(SHOP).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Error requesting access token");
    assert_eq!(app.shopify.count(FakeCall::RegisterWebhook), 0);

    let list = app.get("/discount").await;
    assert_eq!(list.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_exchange_timeout_is_gateway_timeout() {
    let mut app = TestApp::new();
    app.shopify.time_out(FakeCall::ExchangeCode);

    let response = app.install(SHOP).await;

    assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
}
