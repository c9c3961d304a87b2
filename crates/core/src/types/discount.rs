//! Discount configuration domain types.
//!
//! A discount configuration is a merchant-defined rule ("orders between X and
//! Y that contain these products get Z off"). Every configuration is mirrored
//! on Shopify as a price rule; `remote_rule_id` links the two.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CollectionId, DiscountId, PriceRuleId, ProductId};
use super::order::OrderEvent;

/// How the discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// A fixed amount off, in the shop's currency.
    FixedAmount,
    /// A percentage off (0-100].
    Percentage,
}

impl DiscountKind {
    /// The value Shopify expects in `value_type` / `type` fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FixedAmount => "fixed_amount",
            Self::Percentage => "percentage",
        }
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedAmount => write!(f, "Fixed amount"),
            Self::Percentage => write!(f, "Percentage"),
        }
    }
}

/// Errors from [`DiscountSpec::validate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscountSpecError {
    /// Discount value is zero or negative.
    #[error("value must be greater than zero")]
    NonPositiveValue,
    /// Percentage discount above 100.
    #[error("percentage value must be at most 100")]
    PercentageTooLarge,
    /// Negative minimum order amount.
    #[error("minimumAmount cannot be negative")]
    NegativeMinimum,
    /// Maximum below minimum.
    #[error("maximumAmount must be greater than or equal to minimumAmount")]
    MaximumBelowMinimum,
}

/// Merchant input for creating or updating a discount configuration.
///
/// This is the JSON body of `POST /discount/create` and
/// `PUT /discount/update/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSpec {
    /// Fixed amount or percentage.
    pub discount_type: DiscountKind,
    /// Positive discount value. Sent to Shopify negated.
    pub value: Decimal,
    /// Orders below this total never match.
    #[serde(default)]
    pub minimum_amount: Decimal,
    /// Orders above this total never match. `None` means unbounded.
    #[serde(default)]
    pub maximum_amount: Option<Decimal>,
    /// Restrict to orders containing an item from one of these collections.
    #[serde(default)]
    pub collections: Vec<CollectionId>,
    /// Restrict to orders containing one of these products.
    #[serde(default)]
    pub products: Vec<ProductId>,
}

impl DiscountSpec {
    /// Check this describes a usable discount.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), DiscountSpecError> {
        if self.value <= Decimal::ZERO {
            return Err(DiscountSpecError::NonPositiveValue);
        }
        if self.discount_type == DiscountKind::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(DiscountSpecError::PercentageTooLarge);
        }
        if self.minimum_amount < Decimal::ZERO {
            return Err(DiscountSpecError::NegativeMinimum);
        }
        if let Some(max) = self.maximum_amount
            && max < self.minimum_amount
        {
            return Err(DiscountSpecError::MaximumBelowMinimum);
        }
        Ok(())
    }

    /// The adjustment Shopify stores on the price rule (always negative).
    #[must_use]
    pub fn price_rule_value(&self) -> Decimal {
        -self.value
    }
}

/// A stored discount configuration.
///
/// Only ever constructed after the matching Shopify price rule exists, so
/// `remote_rule_id` is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountConfiguration {
    /// Local identifier.
    pub id: DiscountId,
    /// Fixed amount or percentage.
    pub discount_type: DiscountKind,
    /// Positive discount value.
    pub value: Decimal,
    /// Inclusive lower bound on the order total.
    pub minimum_amount: Decimal,
    /// Inclusive upper bound on the order total, if any.
    pub maximum_amount: Option<Decimal>,
    /// Collection filter (empty = any).
    pub collections: Vec<CollectionId>,
    /// Product filter (empty = any).
    pub products: Vec<ProductId>,
    /// Shopify price rule mirroring this configuration.
    pub remote_rule_id: PriceRuleId,
    /// When the configuration was created.
    pub created_at: DateTime<Utc>,
    /// When the configuration was last changed.
    pub updated_at: DateTime<Utc>,
}

impl DiscountConfiguration {
    /// Build a configuration from a validated `DiscountSpec` and the price rule that
    /// was provisioned for it.
    #[must_use]
    pub fn new(id: DiscountId, spec: DiscountSpec, remote_rule_id: PriceRuleId) -> Self {
        let now = Utc::now();
        Self {
            id,
            discount_type: spec.discount_type,
            value: spec.value,
            minimum_amount: spec.minimum_amount,
            maximum_amount: spec.maximum_amount,
            collections: spec.collections,
            products: spec.products,
            remote_rule_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Return a copy with the fields from `spec`, keeping identity
    /// (`id`, `remote_rule_id`, `created_at`).
    #[must_use]
    pub fn updated_with(&self, spec: DiscountSpec) -> Self {
        Self {
            id: self.id.clone(),
            discount_type: spec.discount_type,
            value: spec.value,
            minimum_amount: spec.minimum_amount,
            maximum_amount: spec.maximum_amount,
            collections: spec.collections,
            products: spec.products,
            remote_rule_id: self.remote_rule_id,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    /// Whether this configuration applies to `order`.
    ///
    /// All four conditions must hold:
    /// 1. total >= `minimum_amount`
    /// 2. no maximum, or total <= `maximum_amount`
    /// 3. no collection filter, or some line item is in one of the collections
    /// 4. no product filter, or some line item is one of the products
    #[must_use]
    pub fn matches(&self, order: &OrderEvent) -> bool {
        let total = order.total_price;

        let meets_minimum = total >= self.minimum_amount;
        let meets_maximum = self.maximum_amount.is_none_or(|max| total <= max);

        let collections_match = self.collections.is_empty()
            || order.line_items.iter().any(|item| {
                item.collection_ids
                    .iter()
                    .any(|c| self.collections.contains(c))
            });

        let products_match = self.products.is_empty()
            || order
                .line_items
                .iter()
                .any(|item| item.product_id.is_some_and(|p| self.products.contains(&p)));

        meets_minimum && meets_maximum && collections_match && products_match
    }
}
