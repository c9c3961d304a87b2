//! Storage for discount configurations.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use autodiscount_core::{DiscountConfiguration, DiscountId, ShopDomain};

use crate::services::StoreError;

/// Per-shop discount configuration storage.
///
/// `list` returns configurations in insertion order. Matching treats that
/// order as priority, so implementations must preserve it, and `replace`
/// must keep a record in its original position.
#[async_trait]
pub trait DiscountStore: Send + Sync {
    async fn list(&self, shop: &ShopDomain) -> Result<Vec<DiscountConfiguration>, StoreError>;

    async fn get(
        &self,
        shop: &ShopDomain,
        id: &DiscountId,
    ) -> Result<Option<DiscountConfiguration>, StoreError>;

    /// Append a new configuration.
    ///
    /// Fails with `Conflict` if the id is already present for the shop.
    async fn insert(&self, shop: &ShopDomain, config: DiscountConfiguration)
    -> Result<(), StoreError>;

    /// Replace the configuration with the same id. Returns `false` if absent.
    async fn replace(
        &self,
        shop: &ShopDomain,
        config: DiscountConfiguration,
    ) -> Result<bool, StoreError>;

    /// Remove a configuration. Returns `false` if absent.
    async fn remove(&self, shop: &ShopDomain, id: &DiscountId) -> Result<bool, StoreError>;
}

/// Process-local discount store. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryDiscountStore {
    shops: RwLock<HashMap<ShopDomain, Vec<DiscountConfiguration>>>,
}

impl InMemoryDiscountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DiscountStore for InMemoryDiscountStore {
    async fn list(&self, shop: &ShopDomain) -> Result<Vec<DiscountConfiguration>, StoreError> {
        Ok(self.shops.read().await.get(shop).cloned().unwrap_or_default())
    }

    async fn get(
        &self,
        shop: &ShopDomain,
        id: &DiscountId,
    ) -> Result<Option<DiscountConfiguration>, StoreError> {
        Ok(self
            .shops
            .read()
            .await
            .get(shop)
            .and_then(|configs| configs.iter().find(|c| &c.id == id).cloned()))
    }

    async fn insert(
        &self,
        shop: &ShopDomain,
        config: DiscountConfiguration,
    ) -> Result<(), StoreError> {
        let mut shops = self.shops.write().await;
        let configs = shops.entry(shop.clone()).or_default();
        if configs.iter().any(|c| c.id == config.id) {
            return Err(StoreError::Conflict(config.id.to_string()));
        }
        configs.push(config);
        Ok(())
    }

    async fn replace(
        &self,
        shop: &ShopDomain,
        config: DiscountConfiguration,
    ) -> Result<bool, StoreError> {
        let mut shops = self.shops.write().await;
        let Some(slot) = shops
            .get_mut(shop)
            .and_then(|configs| configs.iter_mut().find(|c| c.id == config.id))
        else {
            return Ok(false);
        };
        *slot = config;
        Ok(true)
    }

    async fn remove(&self, shop: &ShopDomain, id: &DiscountId) -> Result<bool, StoreError> {
        let mut shops = self.shops.write().await;
        let Some(configs) = shops.get_mut(shop) else {
            return Ok(false);
        };
        let before = configs.len();
        configs.retain(|c| &c.id != id);
        Ok(configs.len() != before)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use autodiscount_core::{DiscountKind, DiscountSpec, PriceRuleId};
    use rust_decimal_macros::dec;

    use super::*;

    fn shop(name: &str) -> ShopDomain {
        ShopDomain::parse(&format!("{name}.myshopify.com")).unwrap()
    }

    fn config(id: &str, value: rust_decimal::Decimal) -> DiscountConfiguration {
        DiscountConfiguration::new(
            DiscountId::from(id),
            DiscountSpec {
                discount_type: DiscountKind::FixedAmount,
                value,
                minimum_amount: dec!(0),
                maximum_amount: None,
                collections: vec![],
                products: vec![],
            },
            PriceRuleId::new(1),
        )
    }

    fn ids(configs: &[DiscountConfiguration]) -> Vec<&str> {
        configs.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let store = InMemoryDiscountStore::new();
        let a = shop("a");
        for id in ["c", "a", "b"] {
            store.insert(&a, config(id, dec!(5))).await.unwrap();
        }

        assert_eq!(ids(&store.list(&a).await.unwrap()), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_replace_keeps_position() {
        let store = InMemoryDiscountStore::new();
        let a = shop("a");
        for id in ["first", "second", "third"] {
            store.insert(&a, config(id, dec!(5))).await.unwrap();
        }

        assert!(store.replace(&a, config("second", dec!(9))).await.unwrap());

        let listed = store.list(&a).await.unwrap();
        assert_eq!(ids(&listed), vec!["first", "second", "third"]);
        assert_eq!(listed.get(1).unwrap().value, dec!(9));
        assert!(!store.replace(&a, config("missing", dec!(1))).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = InMemoryDiscountStore::new();
        let a = shop("a");
        store.insert(&a, config("x", dec!(5))).await.unwrap();

        let result = store.insert(&a, config("x", dec!(6))).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_shops_are_isolated() {
        let store = InMemoryDiscountStore::new();
        store.insert(&shop("a"), config("x", dec!(5))).await.unwrap();

        assert!(store.list(&shop("b")).await.unwrap().is_empty());
        assert!(store.get(&shop("b"), &DiscountId::from("x")).await.unwrap().is_none());
        assert!(!store.remove(&shop("b"), &DiscountId::from("x")).await.unwrap());
        assert!(store.remove(&shop("a"), &DiscountId::from("x")).await.unwrap());
        assert!(store.list(&shop("a")).await.unwrap().is_empty());
    }
}
