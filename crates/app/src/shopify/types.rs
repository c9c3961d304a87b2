//! REST Admin API request and response bodies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autodiscount_core::{DiscountConfiguration, DiscountId, DiscountSpec, OrderId, PriceRuleId};

// =============================================================================
// OAuth
// =============================================================================

/// Body of `POST /admin/oauth/access_token`.
#[derive(Debug, Serialize)]
pub struct TokenExchangeRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
}

/// Offline access token returned by the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
}

// =============================================================================
// Webhooks
// =============================================================================

#[derive(Debug, Serialize)]
pub struct WebhookEnvelope<'a> {
    pub webhook: WebhookRegistration<'a>,
}

/// A webhook subscription.
#[derive(Debug, Serialize)]
pub struct WebhookRegistration<'a> {
    pub topic: &'a str,
    pub address: &'a str,
    pub format: &'static str,
}

// =============================================================================
// Price rules
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceRuleEnvelope<T> {
    pub price_rule: T,
}

/// Price rule created for a new discount configuration.
///
/// Applies to all line items of any customer, with the value spread across
/// the eligible items.
#[derive(Debug, Serialize)]
pub struct NewPriceRule {
    pub title: String,
    pub target_type: &'static str,
    pub target_selection: &'static str,
    pub allocation_method: &'static str,
    pub value_type: &'static str,
    pub value: Decimal,
    pub customer_selection: &'static str,
    pub starts_at: DateTime<Utc>,
}

impl NewPriceRule {
    #[must_use]
    pub fn for_discount(id: &DiscountId, spec: &DiscountSpec, starts_at: DateTime<Utc>) -> Self {
        Self {
            title: format!("Discount_{id}"),
            target_type: "line_item",
            target_selection: "all",
            allocation_method: "across",
            value_type: spec.discount_type.as_str(),
            value: spec.price_rule_value(),
            customer_selection: "all",
            starts_at,
        }
    }
}

/// Fields changed on update.
#[derive(Debug, Serialize)]
pub struct PriceRuleUpdate {
    pub value_type: &'static str,
    pub value: Decimal,
}

impl From<&DiscountSpec> for PriceRuleUpdate {
    fn from(spec: &DiscountSpec) -> Self {
        Self {
            value_type: spec.discount_type.as_str(),
            value: spec.price_rule_value(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatedPriceRule {
    pub id: PriceRuleId,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Serialize)]
pub struct OrderEnvelope {
    pub order: OrderDiscountUpdate,
}

/// `PUT /orders/{id}.json` body attaching a discount code.
#[derive(Debug, Serialize)]
pub struct OrderDiscountUpdate {
    pub id: OrderId,
    pub discount_codes: Vec<DiscountCodeInput>,
}

#[derive(Debug, Serialize)]
pub struct DiscountCodeInput {
    pub code: &'static str,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl OrderDiscountUpdate {
    #[must_use]
    pub fn new(order_id: OrderId, code: &'static str, config: &DiscountConfiguration) -> Self {
        Self {
            id: order_id,
            discount_codes: vec![DiscountCodeInput {
                code,
                amount: config.value,
                kind: config.discount_type.as_str(),
            }],
        }
    }
}
