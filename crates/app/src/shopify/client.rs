//! REST Admin API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;

use autodiscount_core::{
    DiscountConfiguration, DiscountId, DiscountSpec, OrderId, PriceRuleId, ShopDomain,
};

use crate::config::ShopifyAppConfig;
use crate::services::credentials::AccessCredential;

use super::types::{
    CreatedPriceRule, NewPriceRule, OrderDiscountUpdate, OrderEnvelope, PriceRuleEnvelope,
    PriceRuleUpdate, TokenExchangeRequest, TokenExchangeResponse, WebhookEnvelope,
    WebhookRegistration,
};
use super::{AUTO_DISCOUNT_CODE, OAuthApi, PricingApi, ShopifyError};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Shopify REST Admin API client.
///
/// Cheap to clone. Every request carries the timeout given at construction;
/// an elapsed timeout surfaces as [`ShopifyError::Timeout`].
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    client: reqwest::Client,
    api_version: String,
    client_id: String,
    client_secret: SecretString,
}

impl ShopifyClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyAppConfig, timeout: Duration) -> Result<Self, ShopifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(ShopifyClientInner {
                client,
                api_version: config.api_version.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            }),
        })
    }

    fn admin_url(&self, shop: &ShopDomain, path: &str) -> String {
        format!(
            "https://{shop}/admin/api/{}/{path}",
            self.inner.api_version
        )
    }

    fn authorized(&self, request: RequestBuilder, credential: &AccessCredential) -> RequestBuilder {
        request.header(ACCESS_TOKEN_HEADER, credential.access_token.expose_secret())
    }

    /// Send a request and parse a JSON body out of a successful response.
    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ShopifyError> {
        let response = Self::send(request).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a request, mapping non-2xx responses to errors.
    async fn send(request: RequestBuilder) -> Result<Response, ShopifyError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<f64>().ok())
                .map_or(2, |secs| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let secs = secs.ceil().max(0.0) as u64;
                    secs
                });
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Accept only `201 Created`; any other success status is an error.
    async fn require_created(response: Response) -> Result<Response, ShopifyError> {
        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl OAuthApi for ShopifyClient {
    #[instrument(skip(self, code), fields(shop = %shop))]
    async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<AccessCredential, ShopifyError> {
        let url = format!("https://{shop}/admin/oauth/access_token");
        let body = TokenExchangeRequest {
            client_id: &self.inner.client_id,
            client_secret: self.inner.client_secret.expose_secret(),
            code,
        };

        let token: TokenExchangeResponse =
            Self::send_json(self.inner.client.post(&url).json(&body)).await?;

        Ok(AccessCredential {
            shop: shop.clone(),
            access_token: SecretString::from(token.access_token),
            scopes: token
                .scope
                .split(',')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            obtained_at: Utc::now().timestamp(),
        })
    }

    #[instrument(skip(self, credential), fields(shop = %credential.shop))]
    async fn register_webhook(
        &self,
        credential: &AccessCredential,
        topic: &str,
        address: &str,
    ) -> Result<(), ShopifyError> {
        let url = self.admin_url(&credential.shop, "webhooks.json");
        let body = WebhookEnvelope {
            webhook: WebhookRegistration {
                topic,
                address,
                format: "json",
            },
        };

        let response =
            Self::send(self.authorized(self.inner.client.post(&url), credential).json(&body))
                .await?;
        Self::require_created(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PricingApi for ShopifyClient {
    #[instrument(skip(self, credential, spec), fields(shop = %credential.shop, discount_id = %id))]
    async fn create_price_rule(
        &self,
        credential: &AccessCredential,
        id: &DiscountId,
        spec: &DiscountSpec,
    ) -> Result<PriceRuleId, ShopifyError> {
        let url = self.admin_url(&credential.shop, "price_rules.json");
        let body = PriceRuleEnvelope {
            price_rule: NewPriceRule::for_discount(id, spec, Utc::now()),
        };

        let created: PriceRuleEnvelope<CreatedPriceRule> =
            Self::send_json(self.authorized(self.inner.client.post(&url), credential).json(&body))
                .await?;
        Ok(created.price_rule.id)
    }

    #[instrument(skip(self, credential, spec), fields(shop = %credential.shop, rule_id = %rule_id))]
    async fn update_price_rule(
        &self,
        credential: &AccessCredential,
        rule_id: PriceRuleId,
        spec: &DiscountSpec,
    ) -> Result<(), ShopifyError> {
        let url = self.admin_url(&credential.shop, &format!("price_rules/{rule_id}.json"));
        let body = PriceRuleEnvelope {
            price_rule: PriceRuleUpdate::from(spec),
        };

        Self::send(self.authorized(self.inner.client.put(&url), credential).json(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self, credential), fields(shop = %credential.shop, rule_id = %rule_id))]
    async fn delete_price_rule(
        &self,
        credential: &AccessCredential,
        rule_id: PriceRuleId,
    ) -> Result<(), ShopifyError> {
        let url = self.admin_url(&credential.shop, &format!("price_rules/{rule_id}.json"));

        Self::send(self.authorized(self.inner.client.delete(&url), credential)).await?;
        Ok(())
    }

    #[instrument(skip(self, credential, config), fields(shop = %credential.shop, order_id = %order_id))]
    async fn apply_order_discount(
        &self,
        credential: &AccessCredential,
        order_id: OrderId,
        config: &DiscountConfiguration,
    ) -> Result<(), ShopifyError> {
        let url = self.admin_url(&credential.shop, &format!("orders/{order_id}.json"));
        let body = OrderEnvelope {
            order: OrderDiscountUpdate::new(order_id, AUTO_DISCOUNT_CODE, config),
        };

        Self::send(self.authorized(self.inner.client.put(&url), credential).json(&body)).await?;
        Ok(())
    }
}
