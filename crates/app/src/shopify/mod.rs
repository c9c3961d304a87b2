//! Shopify platform client boundary.
//!
//! Two traits split the calls this app makes into Shopify:
//!
//! - [`OAuthApi`] - authorization-code exchange and webhook registration,
//!   used once per install by the auth flow.
//! - [`PricingApi`] - price rule create/update/delete and attaching a
//!   discount to an order, used by the discount services.
//!
//! [`ShopifyClient`] implements both over the REST Admin API with `reqwest`.
//! Handlers and services only see the traits, so tests swap in
//! [`crate::testing::FakeShopify`].
//!
//! No call is retried here. A failure is returned to the caller, which
//! decides whether it is fatal.

mod client;
pub mod types;

use async_trait::async_trait;
use autodiscount_core::{
    DiscountConfiguration, DiscountId, DiscountSpec, OrderId, PriceRuleId, ShopDomain,
};
use thiserror::Error;

pub use client::ShopifyClient;

use crate::services::credentials::AccessCredential;

/// Webhook topic this app subscribes to.
pub const ORDERS_CREATE_TOPIC: &str = "orders/create";

/// Discount code attached to orders that match a configuration.
pub const AUTO_DISCOUNT_CODE: &str = "AUTODISCOUNT";

/// Errors that can occur when calling Shopify.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The configured request timeout elapsed.
    #[error("Request to Shopify timed out")]
    Timeout,

    /// Shopify answered with an unexpected status.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (may be empty).
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ShopifyError {
    /// Whether the call failed because the timeout fired.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for ShopifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// OAuth calls made during install.
#[async_trait]
pub trait OAuthApi: Send + Sync {
    /// Exchange an authorization code for an offline access token.
    async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<AccessCredential, ShopifyError>;

    /// Subscribe `address` to `topic` webhooks for the credential's shop.
    async fn register_webhook(
        &self,
        credential: &AccessCredential,
        topic: &str,
        address: &str,
    ) -> Result<(), ShopifyError>;
}

/// Price rule and order discount calls.
#[async_trait]
pub trait PricingApi: Send + Sync {
    /// Create the price rule mirroring a new configuration.
    async fn create_price_rule(
        &self,
        credential: &AccessCredential,
        id: &DiscountId,
        spec: &DiscountSpec,
    ) -> Result<PriceRuleId, ShopifyError>;

    /// Update an existing price rule's value.
    async fn update_price_rule(
        &self,
        credential: &AccessCredential,
        rule_id: PriceRuleId,
        spec: &DiscountSpec,
    ) -> Result<(), ShopifyError>;

    /// Delete a price rule.
    async fn delete_price_rule(
        &self,
        credential: &AccessCredential,
        rule_id: PriceRuleId,
    ) -> Result<(), ShopifyError>;

    /// Attach the configuration's discount to an order.
    async fn apply_order_discount(
        &self,
        credential: &AccessCredential,
        order_id: OrderId,
        config: &DiscountConfiguration,
    ) -> Result<(), ShopifyError>;
}
