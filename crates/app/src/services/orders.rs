//! Applying discounts to new orders.

use std::sync::Arc;

use tracing::{error, info, instrument};

use autodiscount_core::{DiscountId, OrderEvent, OrderId, ShopDomain, find_match};

use crate::services::credentials::CredentialStore;
use crate::services::discounts::{DiscountError, DiscountStore};
use crate::shopify::PricingApi;

/// Result of processing one `orders/create` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The first matching configuration was applied to the order.
    Applied {
        order_id: OrderId,
        discount_id: DiscountId,
    },
    /// No configuration matched. Not an error.
    NoCriteriaMet,
}

impl MatchOutcome {
    /// Message returned to Shopify.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "Discount applied and webhook received",
            Self::NoCriteriaMet => "No discount criteria met",
        }
    }
}

/// Matches verified order events against a shop's configurations.
pub struct OrderDiscounter {
    store: Arc<dyn DiscountStore>,
    pricing: Arc<dyn PricingApi>,
    credentials: Arc<dyn CredentialStore>,
}

impl OrderDiscounter {
    #[must_use]
    pub fn new(
        store: Arc<dyn DiscountStore>,
        pricing: Arc<dyn PricingApi>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            store,
            pricing,
            credentials,
        }
    }

    /// Apply the first matching configuration to `order`, if any.
    ///
    /// The caller must have verified the webhook signature. At most one
    /// Shopify call is made and it is never retried.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` if a configuration matched but the shop has no
    ///   credential
    /// - `DiscountApplicationFailed` / `UpstreamTimeout` if the order update
    ///   fails
    #[instrument(skip(self, order), fields(shop = %shop, order_id = %order.id))]
    pub async fn handle_order_created(
        &self,
        shop: &ShopDomain,
        order: &OrderEvent,
    ) -> Result<MatchOutcome, DiscountError> {
        let configurations = self.store.list(shop).await?;
        let Some(config) = find_match(order, &configurations) else {
            info!(total = %order.total_price, "No discount criteria met");
            return Ok(MatchOutcome::NoCriteriaMet);
        };

        let credential = self
            .credentials
            .get(shop)
            .await?
            .ok_or(DiscountError::NotAuthorized)?;

        self.pricing
            .apply_order_discount(&credential, order.id, config)
            .await
            .map_err(|e| {
                error!(discount_id = %config.id, error = %e, "Error applying discount");
                DiscountError::remote(&e, DiscountError::DiscountApplicationFailed)
            })?;

        info!(discount_id = %config.id, "Discount applied");
        Ok(MatchOutcome::Applied {
            order_id: order.id,
            discount_id: config.id.clone(),
        })
    }
}
