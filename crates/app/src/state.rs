//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::auth::AuthFlow;
use crate::services::credentials::{CredentialStore, InMemoryCredentialStore};
use crate::services::discounts::{DiscountService, DiscountStore, InMemoryDiscountStore};
use crate::services::orders::OrderDiscounter;
use crate::shopify::{OAuthApi, PricingApi, ShopifyClient, ShopifyError};

/// External collaborators the services are wired to.
pub struct Backends {
    pub oauth: Arc<dyn OAuthApi>,
    pub pricing: Arc<dyn PricingApi>,
    pub credentials: Arc<dyn CredentialStore>,
    pub discounts: Arc<dyn DiscountStore>,
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    auth: AuthFlow,
    discounts: DiscountService,
    orders: OrderDiscounter,
}

impl AppState {
    /// Create state backed by the Shopify REST client and in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, ShopifyError> {
        let client = Arc::new(ShopifyClient::new(&config.shopify, config.http_timeout)?);

        Ok(Self::with_backends(
            config,
            Backends {
                oauth: client.clone(),
                pricing: client,
                credentials: Arc::new(InMemoryCredentialStore::new()),
                discounts: Arc::new(InMemoryDiscountStore::new()),
            },
        ))
    }

    /// Create state over explicit backends.
    #[must_use]
    pub fn with_backends(config: AppConfig, backends: Backends) -> Self {
        let auth = AuthFlow::new(&config, backends.oauth, backends.credentials.clone());
        let discounts = DiscountService::new(
            backends.discounts.clone(),
            backends.pricing.clone(),
            backends.credentials.clone(),
        );
        let orders = OrderDiscounter::new(backends.discounts, backends.pricing, backends.credentials);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                auth,
                discounts,
                orders,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn auth(&self) -> &AuthFlow {
        &self.inner.auth
    }

    #[must_use]
    pub fn discounts(&self) -> &DiscountService {
        &self.inner.discounts
    }

    #[must_use]
    pub fn orders(&self) -> &OrderDiscounter {
        &self.inner.orders
    }
}
