//! Integration tests for autodiscount.
//!
//! The full router runs in-process against a scripted Shopify
//! ([`FakeShopify`]), so no network or running server is needed.
//!
//! ```bash
//! cargo test -p autodiscount-integration-tests
//! ```
//!
//! [`TestApp`] plays the part of one browser: it carries the session cookie
//! between requests the way a cookie jar would. Requests Shopify would make
//! (the OAuth redirect back, webhooks) are signed here with the test secrets
//! using `hmac` directly, independent of the app's own signing code.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

pub use autodiscount_app::testing::{
    FakeCall, FakeShopify, TEST_CLIENT_SECRET, TEST_WEBHOOK_SECRET, test_state,
};

/// Shop used by most tests.
pub const SHOP: &str = "demo-store.myshopify.com";

type HmacSha256 = Hmac<Sha256>;

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// One browser talking to an in-process app.
pub struct TestApp {
    router: Router,
    pub shopify: Arc<FakeShopify>,
    cookie: Option<String>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let shopify = Arc::new(FakeShopify::new());
        let router = autodiscount_app::router(test_state(shopify.clone()));
        Self {
            router,
            shopify,
            cookie: None,
        }
    }

    /// A second browser against the same app, without cookies.
    #[must_use]
    pub fn new_browser(&self) -> Self {
        Self {
            router: self.router.clone(),
            shopify: self.shopify.clone(),
            cookie: None,
        }
    }

    /// Send a request, attaching and updating the session cookie.
    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn send_json(&mut self, method: Method, uri: &str, body: &Value) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Start an install and return the state embedded in the consent URL.
    pub async fn start_install(&mut self, shop: &str) -> String {
        let response = self.get(&format!("/auth/install?shop={shop}")).await;
        assert_eq!(response.status, StatusCode::FOUND, "{}", response.text());

        let consent = url::Url::parse(response.location().unwrap()).unwrap();
        consent
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap()
    }

    /// Run install and callback to completion for `shop`.
    pub async fn install(&mut self, shop: &str) -> TestResponse {
        let state = self.start_install(shop).await;
        self.get(&signed_callback_uri(shop, &state, "auth-code")).await
    }

    /// Deliver an `orders/create` webhook.
    pub async fn post_order_webhook(
        &mut self,
        shop: &str,
        raw_body: &[u8],
        hmac: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::post("/discount/webhook/orders/create")
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Shopify-Shop-Domain", shop)
            .header("X-Shopify-Topic", "orders/create");
        if let Some(hmac) = hmac {
            builder = builder.header("X-Shopify-Hmac-Sha256", hmac);
        }
        self.send(builder.body(Body::from(raw_body.to_vec())).unwrap())
            .await
    }
}

/// Callback URL as Shopify would build it, signed with the client secret.
#[must_use]
pub fn signed_callback_uri(shop: &str, state: &str, code: &str) -> String {
    let message = [
        ("code", code),
        ("shop", shop),
        ("state", state),
        ("timestamp", "1700000000"),
    ]
    .iter()
    .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
    .collect::<Vec<_>>()
    .join("&");

    let mut mac = HmacSha256::new_from_slice(TEST_CLIENT_SECRET.as_bytes()).unwrap();
    mac.update(message.as_bytes());
    let hmac = hex::encode(mac.finalize().into_bytes());

    format!("/auth/callback?{message}&hmac={hmac}")
}

/// Base64 webhook signature over `body`.
#[must_use]
pub fn webhook_hmac(body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(TEST_WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}
