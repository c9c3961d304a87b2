//! Test doubles shared by unit and integration tests.
//!
//! Enabled for this crate's tests and, through the `test-support` feature,
//! for the integration-tests crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;

use autodiscount_core::{
    DiscountConfiguration, DiscountId, DiscountSpec, OrderId, PriceRuleId, ShopDomain,
};

use crate::config::{AppConfig, ShopifyAppConfig};
use crate::services::credentials::{AccessCredential, InMemoryCredentialStore};
use crate::services::discounts::InMemoryDiscountStore;
use crate::services::signature::QueryOrder;
use crate::shopify::{OAuthApi, PricingApi, ShopifyError};
use crate::state::{AppState, Backends};

/// Client secret used by [`test_config`].
pub const TEST_CLIENT_SECRET: &str = "shpss_k3Y9qTz7LmW2xR8vB4nC6dF1";

/// Webhook secret used by [`test_config`].
pub const TEST_WEBHOOK_SECRET: &str = "whsec_P5sJ0uH7gE2aV9yK4tN8rM3c";

/// Configuration for tests. No environment access.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig {
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "https://discounts.example.test".to_string(),
        shopify: ShopifyAppConfig {
            client_id: "test-client-id".to_string(),
            client_secret: SecretString::from(TEST_CLIENT_SECRET),
            webhook_secret: SecretString::from(TEST_WEBHOOK_SECRET),
            scopes: vec!["write_discounts".to_string(), "write_orders".to_string()],
            api_version: "2024-04".to_string(),
            hmac_canonical_order: QueryOrder::Received,
        },
        http_timeout: Duration::from_secs(10),
        oauth_state_ttl: Duration::from_secs(600),
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Shopify operations the fake records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeCall {
    ExchangeCode,
    RegisterWebhook,
    CreatePriceRule,
    UpdatePriceRule,
    DeletePriceRule,
    ApplyOrderDiscount,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Status,
    Timeout,
}

/// In-memory stand-in for Shopify.
///
/// Every call is recorded, including failed ones. Calls succeed unless
/// scripted to fail with [`FakeShopify::fail`] or [`FakeShopify::time_out`].
/// Price rule ids are handed out from 1001 upward.
#[derive(Debug)]
pub struct FakeShopify {
    calls: Mutex<Vec<FakeCall>>,
    failures: Mutex<HashMap<FakeCall, Failure>>,
    next_rule_id: AtomicI64,
}

impl Default for FakeShopify {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeShopify {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            next_rule_id: AtomicI64::new(1001),
        }
    }

    /// Make `call` answer with HTTP 500 from now on.
    pub fn fail(&self, call: FakeCall) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call, Failure::Status);
    }

    /// Make `call` time out from now on.
    pub fn time_out(&self, call: FakeCall) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call, Failure::Timeout);
    }

    /// Number of recorded calls of one kind.
    #[must_use]
    pub fn count(&self, call: FakeCall) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| **c == call)
            .count()
    }

    /// Every recorded call, in the order it was made.
    #[must_use]
    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Record `call` and yield once, like a network round trip would, so
    /// concurrent callers interleave.
    async fn call(&self, call: FakeCall) -> Result<(), ShopifyError> {
        let result = self.record(call);
        tokio::task::yield_now().await;
        result
    }

    fn record(&self, call: FakeCall) -> Result<(), ShopifyError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&call)
        {
            None => Ok(()),
            Some(Failure::Timeout) => Err(ShopifyError::Timeout),
            Some(Failure::Status) => Err(ShopifyError::Status {
                status: 500,
                body: "simulated failure".to_string(),
            }),
        }
    }
}

#[async_trait]
impl OAuthApi for FakeShopify {
    async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<AccessCredential, ShopifyError> {
        self.call(FakeCall::ExchangeCode).await?;
        Ok(AccessCredential {
            shop: shop.clone(),
            access_token: SecretString::from(format!("shpat_{code}")),
            scopes: vec!["write_discounts".to_string(), "write_orders".to_string()],
            obtained_at: Utc::now().timestamp(),
        })
    }

    async fn register_webhook(
        &self,
        _credential: &AccessCredential,
        _topic: &str,
        _address: &str,
    ) -> Result<(), ShopifyError> {
        self.call(FakeCall::RegisterWebhook).await
    }
}

#[async_trait]
impl PricingApi for FakeShopify {
    async fn create_price_rule(
        &self,
        _credential: &AccessCredential,
        _id: &DiscountId,
        _spec: &DiscountSpec,
    ) -> Result<PriceRuleId, ShopifyError> {
        self.call(FakeCall::CreatePriceRule).await?;
        Ok(PriceRuleId::new(
            self.next_rule_id.fetch_add(1, Ordering::SeqCst),
        ))
    }

    async fn update_price_rule(
        &self,
        _credential: &AccessCredential,
        _rule_id: PriceRuleId,
        _spec: &DiscountSpec,
    ) -> Result<(), ShopifyError> {
        self.call(FakeCall::UpdatePriceRule).await
    }

    async fn delete_price_rule(
        &self,
        _credential: &AccessCredential,
        _rule_id: PriceRuleId,
    ) -> Result<(), ShopifyError> {
        self.call(FakeCall::DeletePriceRule).await
    }

    async fn apply_order_discount(
        &self,
        _credential: &AccessCredential,
        _order_id: OrderId,
        _config: &DiscountConfiguration,
    ) -> Result<(), ShopifyError> {
        self.call(FakeCall::ApplyOrderDiscount).await
    }
}

/// State wired to `shopify` and fresh in-memory stores.
#[must_use]
pub fn test_state(shopify: Arc<FakeShopify>) -> AppState {
    AppState::with_backends(
        test_config(),
        Backends {
            oauth: shopify.clone(),
            pricing: shopify,
            credentials: Arc::new(InMemoryCredentialStore::new()),
            discounts: Arc::new(InMemoryDiscountStore::new()),
        },
    )
}
