//! Per-shop Shopify access credentials.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;

use autodiscount_core::ShopDomain;

use super::StoreError;

/// Offline access token granted to this app by one shop.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct AccessCredential {
    /// Shop the token is valid for
    pub shop: ShopDomain,
    /// Token sent as `X-Shopify-Access-Token`
    pub access_token: SecretString,
    /// Granted scopes
    pub scopes: Vec<String>,
    /// Unix timestamp when the token was obtained
    pub obtained_at: i64,
}

impl std::fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCredential")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Storage for access credentials, one per shop.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store a credential, replacing any earlier one for the same shop.
    async fn save(&self, credential: AccessCredential) -> Result<(), StoreError>;

    /// Look up the credential for a shop.
    async fn get(&self, shop: &ShopDomain) -> Result<Option<AccessCredential>, StoreError>;
}

/// Process-local credential store. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<ShopDomain, AccessCredential>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn save(&self, credential: AccessCredential) -> Result<(), StoreError> {
        self.credentials
            .write()
            .await
            .insert(credential.shop.clone(), credential);
        Ok(())
    }

    async fn get(&self, shop: &ShopDomain) -> Result<Option<AccessCredential>, StoreError> {
        Ok(self.credentials.read().await.get(shop).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn credential(shop: &str, token: &str) -> AccessCredential {
        AccessCredential {
            shop: ShopDomain::parse(shop).unwrap(),
            access_token: SecretString::from(token),
            scopes: vec!["write_discounts".to_string()],
            obtained_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug_output = format!("{:?}", credential("a.myshopify.com", "shpat_secret_value"));

        assert!(debug_output.contains("a.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_secret_value"));
    }

    #[tokio::test]
    async fn test_credentials_are_isolated_per_shop() {
        let store = InMemoryCredentialStore::new();
        store.save(credential("a.myshopify.com", "token-a")).await.unwrap();
        store.save(credential("b.myshopify.com", "token-b")).await.unwrap();

        let a = store
            .get(&ShopDomain::parse("a.myshopify.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.access_token.expose_secret(), "token-a");

        let missing = store
            .get(&ShopDomain::parse("c.myshopify.com").unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_reinstall_replaces_credential() {
        let store = InMemoryCredentialStore::new();
        store.save(credential("a.myshopify.com", "old")).await.unwrap();
        store.save(credential("a.myshopify.com", "new")).await.unwrap();

        let a = store
            .get(&ShopDomain::parse("a.myshopify.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.access_token.expose_secret(), "new");
    }
}
