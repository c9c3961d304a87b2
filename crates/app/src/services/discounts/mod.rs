//! Discount configuration management.
//!
//! Every configuration is mirrored by a Shopify price rule. Local state only
//! changes after the matching remote call succeeds:
//!
//! | Operation | Remote call          | Local change on success |
//! |-----------|----------------------|-------------------------|
//! | create    | create price rule    | append                  |
//! | update    | update price rule    | replace in place        |
//! | delete    | delete price rule    | remove                  |
//!
//! A failed remote call leaves the store untouched. Mutations run one at a
//! time behind a single lock so two writers never interleave a
//! read-remote-write sequence.

mod error;
mod store;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use autodiscount_core::{DiscountConfiguration, DiscountId, DiscountSpec, ShopDomain};

pub use error::DiscountError;
pub use store::{DiscountStore, InMemoryDiscountStore};

use crate::services::credentials::{AccessCredential, CredentialStore};
use crate::shopify::PricingApi;

/// Create, update, delete and list a shop's discount configurations.
pub struct DiscountService {
    store: Arc<dyn DiscountStore>,
    pricing: Arc<dyn PricingApi>,
    credentials: Arc<dyn CredentialStore>,
    write_lock: Mutex<()>,
}

impl DiscountService {
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
            write_lock: Mutex::new(()),
        }
    }

    async fn credential(&self, shop: &ShopDomain) -> Result<AccessCredential, DiscountError> {
        self.credentials
            .get(shop)
            .await?
            .ok_or(DiscountError::NotAuthorized)
    }

    /// All configurations for `shop`, in priority order.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` if the shop has no credential.
    pub async fn list(&self, shop: &ShopDomain) -> Result<Vec<DiscountConfiguration>, DiscountError> {
        self.credential(shop).await?;
        Ok(self.store.list(shop).await?)
    }

    /// Provision a price rule and store the new configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `spec` fails validation
    /// - `NotAuthorized` if the shop has no credential
    /// - `RemoteProvisioningFailed` / `UpstreamTimeout` if Shopify rejects or
    ///   does not answer; nothing is stored
    #[instrument(skip(self, spec), fields(shop = %shop))]
    pub async fn create(
        &self,
        shop: &ShopDomain,
        spec: DiscountSpec,
    ) -> Result<DiscountConfiguration, DiscountError> {
        spec.validate()?;
        let credential = self.credential(shop).await?;
        let _guard = self.write_lock.lock().await;

        let id = DiscountId::generate();
        let rule_id = self
            .pricing
            .create_price_rule(&credential, &id, &spec)
            .await
            .map_err(|e| {
                error!(discount_id = %id, error = %e, "Failed to create price rule");
                DiscountError::remote(&e, DiscountError::RemoteProvisioningFailed)
            })?;

        let config = DiscountConfiguration::new(id, spec, rule_id);
        if let Err(e) = self.store.insert(shop, config.clone()).await {
            error!(
                discount_id = %config.id,
                rule_id = %rule_id,
                error = %e,
                "Price rule created but configuration was not stored"
            );
            return Err(e.into());
        }

        info!(discount_id = %config.id, rule_id = %rule_id, "Discount configuration saved");
        Ok(config)
    }

    /// Update the price rule, then replace the stored configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `spec` fails validation
    /// - `NotAuthorized` if the shop has no credential
    /// - `NotFound` if `id` is unknown; Shopify is not called
    /// - `RemoteUpdateFailed` / `UpstreamTimeout` if Shopify rejects or does
    ///   not answer; the stored configuration is unchanged
    #[instrument(skip(self, spec), fields(shop = %shop, discount_id = %id))]
    pub async fn update(
        &self,
        shop: &ShopDomain,
        id: &DiscountId,
        spec: DiscountSpec,
    ) -> Result<DiscountConfiguration, DiscountError> {
        spec.validate()?;
        let credential = self.credential(shop).await?;
        let _guard = self.write_lock.lock().await;

        let existing = self
            .store
            .get(shop, id)
            .await?
            .ok_or_else(|| DiscountError::NotFound(id.clone()))?;

        self.pricing
            .update_price_rule(&credential, existing.remote_rule_id, &spec)
            .await
            .map_err(|e| {
                error!(rule_id = %existing.remote_rule_id, error = %e, "Failed to update price rule");
                DiscountError::remote(&e, DiscountError::RemoteUpdateFailed)
            })?;

        let updated = existing.updated_with(spec);
        if !self.store.replace(shop, updated.clone()).await? {
            return Err(DiscountError::NotFound(id.clone()));
        }

        info!("Discount configuration updated");
        Ok(updated)
    }

    /// Delete the price rule, then remove the stored configuration.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` if the shop has no credential
    /// - `NotFound` if `id` is unknown; Shopify is not called
    /// - `RemoteDeleteFailed` / `UpstreamTimeout` if Shopify rejects or does
    ///   not answer; the configuration is kept
    #[instrument(skip(self), fields(shop = %shop, discount_id = %id))]
    pub async fn delete(&self, shop: &ShopDomain, id: &DiscountId) -> Result<(), DiscountError> {
        let credential = self.credential(shop).await?;
        let _guard = self.write_lock.lock().await;

        let existing = self
            .store
            .get(shop, id)
            .await?
            .ok_or_else(|| DiscountError::NotFound(id.clone()))?;

        self.pricing
            .delete_price_rule(&credential, existing.remote_rule_id)
            .await
            .map_err(|e| {
                error!(rule_id = %existing.remote_rule_id, error = %e, "Failed to delete price rule");
                DiscountError::remote(&e, DiscountError::RemoteDeleteFailed)
            })?;

        self.store.remove(shop, id).await?;
        info!(rule_id = %existing.remote_rule_id, "Discount configuration deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use autodiscount_core::{DiscountKind, PriceRuleId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use secrecy::SecretString;

    use super::*;
    use crate::services::credentials::InMemoryCredentialStore;
    use crate::testing::{FakeCall, FakeShopify};

    const SHOP: &str = "demo-store.myshopify.com";

    struct Harness {
        service: DiscountService,
        shopify: Arc<FakeShopify>,
        shop: ShopDomain,
    }

    async fn harness() -> Harness {
        let shop = ShopDomain::parse(SHOP).unwrap();
        let shopify = Arc::new(FakeShopify::new());
        let credentials = Arc::new(InMemoryCredentialStore::new());
        credentials
            .save(AccessCredential {
                shop: shop.clone(),
                access_token: SecretString::from("shpat_test"),
                scopes: vec!["write_discounts".to_string()],
                obtained_at: 0,
            })
            .await
            .unwrap();

        let service = DiscountService::new(
            Arc::new(InMemoryDiscountStore::new()),
            shopify.clone(),
            credentials,
        );
        Harness {
            service,
            shopify,
            shop,
        }
    }

    fn spec(value: Decimal) -> DiscountSpec {
        DiscountSpec {
            discount_type: DiscountKind::FixedAmount,
            value,
            minimum_amount: dec!(50),
            maximum_amount: None,
            collections: vec![],
            products: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_stores_remote_rule_id() {
        let h = harness().await;

        let created = h.service.create(&h.shop, spec(dec!(10))).await.unwrap();

        assert_eq!(created.remote_rule_id, PriceRuleId::new(1001));
        assert_eq!(h.service.list(&h.shop).await.unwrap(), vec![created]);
        assert_eq!(h.shopify.count(FakeCall::CreatePriceRule), 1);
    }

    #[tokio::test]
    async fn test_create_failure_leaves_list_unchanged() {
        let h = harness().await;
        let first = h.service.create(&h.shop, spec(dec!(10))).await.unwrap();
        h.shopify.fail(FakeCall::CreatePriceRule);

        let result = h.service.create(&h.shop, spec(dec!(20))).await;

        assert!(matches!(result, Err(DiscountError::RemoteProvisioningFailed(_))));
        assert_eq!(h.service.list(&h.shop).await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_create_timeout() {
        let h = harness().await;
        h.shopify.time_out(FakeCall::CreatePriceRule);

        let result = h.service.create(&h.shop, spec(dec!(10))).await;

        assert!(matches!(result, Err(DiscountError::UpstreamTimeout)));
        assert!(h.service.list(&h.shop).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_spec_is_rejected_without_remote_call() {
        let h = harness().await;

        let result = h.service.create(&h.shop, spec(dec!(0))).await;

        assert!(matches!(result, Err(DiscountError::InvalidInput(_))));
        assert_eq!(h.shopify.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_shop() {
        let h = harness().await;
        let stranger = ShopDomain::parse("stranger.myshopify.com").unwrap();

        assert!(matches!(
            h.service.create(&stranger, spec(dec!(10))).await,
            Err(DiscountError::NotAuthorized)
        ));
        assert!(matches!(
            h.service.list(&stranger).await,
            Err(DiscountError::NotAuthorized)
        ));
        assert_eq!(h.shopify.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_unknown_id_makes_no_remote_call() {
        let h = harness().await;

        let result = h
            .service
            .update(&h.shop, &DiscountId::from("missing"), spec(dec!(10)))
            .await;

        assert!(matches!(result, Err(DiscountError::NotFound(_))));
        assert_eq!(h.shopify.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_record() {
        let h = harness().await;
        let created = h.service.create(&h.shop, spec(dec!(10))).await.unwrap();

        let updated = h
            .service
            .update(&h.shop, &created.id, spec(dec!(25)))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.remote_rule_id, created.remote_rule_id);
        assert_eq!(updated.value, dec!(25));
        assert_eq!(h.service.list(&h.shop).await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_record() {
        let h = harness().await;
        let created = h.service.create(&h.shop, spec(dec!(10))).await.unwrap();
        h.shopify.fail(FakeCall::UpdatePriceRule);

        let result = h.service.update(&h.shop, &created.id, spec(dec!(25))).await;

        assert!(matches!(result, Err(DiscountError::RemoteUpdateFailed(_))));
        assert_eq!(h.service.list(&h.shop).await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let h = harness().await;
        let created = h.service.create(&h.shop, spec(dec!(10))).await.unwrap();

        h.service.delete(&h.shop, &created.id).await.unwrap();

        assert!(h.service.list(&h.shop).await.unwrap().is_empty());
        assert_eq!(h.shopify.count(FakeCall::DeletePriceRule), 1);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_record() {
        let h = harness().await;
        let created = h.service.create(&h.shop, spec(dec!(10))).await.unwrap();
        h.shopify.fail(FakeCall::DeletePriceRule);

        let result = h.service.delete(&h.shop, &created.id).await;

        assert!(matches!(result, Err(DiscountError::RemoteDeleteFailed(_))));
        assert_eq!(h.service.list(&h.shop).await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_concurrent_update_and_delete_are_serialized() {
        let h = harness().await;
        let created = h.service.create(&h.shop, spec(dec!(10))).await.unwrap();

        let (updated, deleted) = tokio::join!(
            h.service.update(&h.shop, &created.id, spec(dec!(25))),
            h.service.delete(&h.shop, &created.id),
        );

        deleted.unwrap();
        assert!(h.service.list(&h.shop).await.unwrap().is_empty());
        match updated {
            // Update ran to completion before delete started.
            Ok(config) => {
                assert_eq!(config.value, dec!(25));
                assert_eq!(
                    h.shopify.calls(),
                    vec![
                        FakeCall::CreatePriceRule,
                        FakeCall::UpdatePriceRule,
                        FakeCall::DeletePriceRule
                    ]
                );
            }
            // Delete went first; update never reached Shopify.
            Err(err) => {
                assert!(matches!(err, DiscountError::NotFound(_)));
                assert_eq!(
                    h.shopify.calls(),
                    vec![FakeCall::CreatePriceRule, FakeCall::DeletePriceRule]
                );
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_creates_keep_every_configuration() {
        let h = harness().await;

        let (a, b, c) = tokio::join!(
            h.service.create(&h.shop, spec(dec!(10))),
            h.service.create(&h.shop, spec(dec!(20))),
            h.service.create(&h.shop, spec(dec!(30))),
        );

        let ids = [a.unwrap().id, b.unwrap().id, c.unwrap().id];
        let listed = h.service.list(&h.shop).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(ids.iter().all(|id| listed.iter().any(|config| &config.id == id)));
        assert_eq!(h.shopify.count(FakeCall::CreatePriceRule), 3);
    }

    #[tokio::test]
    async fn test_delete_unknown_id() {
        let h = harness().await;

        let result = h.service.delete(&h.shop, &DiscountId::from("missing")).await;

        assert!(matches!(result, Err(DiscountError::NotFound(_))));
        assert_eq!(h.shopify.total_calls(), 0);
    }
}
