//! Shopify install flow.
//!
//! ```text
//! Unauthenticated --initiate_install--> AwaitingCallback --handle_callback--> Authorized
//! ```
//!
//! The issued [`AuthorizationState`] travels in the browser session between
//! the two steps. The route layer removes it from the session before calling
//! [`AuthFlow::handle_callback`], so a state value can never be presented
//! twice.
//!
//! Callback checks run in this order and stop at the first failure:
//!
//! 1. Presented `state` equals the issued state, which is unexpired and was
//!    issued for the same shop
//! 2. The `hmac` parameter signs the rest of the query
//! 3. The authorization code is exchanged for an access token
//!
//! Nothing is written and no request leaves the process until 1 and 2 pass.
//! Webhook registration after a successful exchange is best-effort.

mod error;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use autodiscount_core::ShopDomain;

pub use error::AuthError;

use crate::config::AppConfig;
use crate::services::credentials::CredentialStore;
use crate::services::signature::{self, QueryOrder};
use crate::shopify::{ORDERS_CREATE_TOPIC, OAuthApi};

/// Where the browser lands once the install completes.
pub const MANAGEMENT_PATH: &str = "/discount";

/// Anti-CSRF token issued for one install attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationState {
    value: String,
    shop: ShopDomain,
    issued_at: DateTime<Utc>,
}

impl AuthorizationState {
    /// Issue a fresh state: 256 random bits, hex-encoded.
    #[must_use]
    pub fn issue(shop: ShopDomain) -> Self {
        Self {
            value: hex::encode(rand::random::<[u8; 32]>()),
            shop,
            issued_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.issued_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed > ttl)
    }
}

/// Consent redirect produced by [`AuthFlow::initiate_install`].
#[derive(Debug, Clone)]
pub struct InstallRedirect {
    pub authorize_url: String,
    pub state: AuthorizationState,
}

/// Callback query parameters in the order they were received.
#[derive(Debug, Clone, Default)]
pub struct CallbackQuery {
    params: Vec<(String, String)>,
}

impl CallbackQuery {
    /// Decode a raw query string (without the leading `?`).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self {
            params: url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// First value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl FromIterator<(String, String)> for CallbackQuery {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

/// A completed install.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub shop: ShopDomain,
    /// `false` when the `orders/create` subscription could not be created.
    pub webhook_registered: bool,
}

/// Drives the OAuth authorization-code flow for one Shopify app.
pub struct AuthFlow {
    client_id: String,
    client_secret: SecretString,
    scopes: String,
    redirect_uri: String,
    webhook_address: String,
    canonical_order: QueryOrder,
    state_ttl: Duration,
    oauth: Arc<dyn OAuthApi>,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthFlow {
    #[must_use]
    pub fn new(
        config: &AppConfig,
        oauth: Arc<dyn OAuthApi>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client_id: config.shopify.client_id.clone(),
            client_secret: config.shopify.client_secret.clone(),
            scopes: config.shopify.scopes.join(","),
            redirect_uri: config.redirect_uri(),
            webhook_address: config.orders_webhook_address(),
            canonical_order: config.shopify.hmac_canonical_order,
            state_ttl: config.oauth_state_ttl,
            oauth,
            credentials,
        }
    }

    /// Start an install for `shop`.
    ///
    /// The caller must keep the returned state in the browser session and
    /// redirect to `authorize_url`.
    ///
    /// # Errors
    ///
    /// Returns `MissingParameter` if no shop was given and
    /// `InvalidShopDomain` if it is not a `*.myshopify.com` domain.
    pub fn initiate_install(&self, shop: Option<&str>) -> Result<InstallRedirect, AuthError> {
        let raw = shop
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthError::MissingParameter("shop"))?;
        let shop = ShopDomain::parse(raw)?;
        let state = AuthorizationState::issue(shop);

        Ok(InstallRedirect {
            authorize_url: self.authorization_url(&state),
            state,
        })
    }

    fn authorization_url(&self, state: &AuthorizationState) -> String {
        format!(
            "https://{}/admin/oauth/authorize?client_id={}&scope={}&state={}&redirect_uri={}",
            state.shop,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.scopes),
            urlencoding::encode(&state.value),
            urlencoding::encode(&self.redirect_uri),
        )
    }

    /// Complete an install from Shopify's redirect.
    ///
    /// `issued` is the state stored in the session by the install step, if
    /// any.
    ///
    /// # Errors
    ///
    /// - `CsrfMismatch` if the state check fails
    /// - `SignatureInvalid` if the `hmac` parameter is missing or wrong
    /// - `MissingParameter` / `InvalidShopDomain` for a malformed signed query
    /// - `TokenExchangeFailed` / `UpstreamTimeout` if Shopify rejects or does
    ///   not answer the code exchange
    /// - `CredentialStore` if the token cannot be stored
    #[instrument(skip_all)]
    pub async fn handle_callback(
        &self,
        query: &CallbackQuery,
        issued: Option<AuthorizationState>,
    ) -> Result<Authorized, AuthError> {
        self.check_state(query, issued.as_ref(), Utc::now())?;

        let presented_hmac = query.get("hmac").ok_or(AuthError::SignatureInvalid)?;
        if !signature::verify_callback_query(
            self.client_secret.expose_secret().as_bytes(),
            query.params(),
            presented_hmac,
            self.canonical_order,
        ) {
            warn!("OAuth callback HMAC validation failed");
            return Err(AuthError::SignatureInvalid);
        }

        let shop = ShopDomain::parse(query.get("shop").ok_or(AuthError::MissingParameter("shop"))?)?;
        let code = query
            .get("code")
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingParameter("code"))?;

        let credential = self.oauth.exchange_code(&shop, code).await.map_err(|e| {
            warn!(shop = %shop, error = %e, "Failed to exchange OAuth code");
            if e.is_timeout() {
                AuthError::UpstreamTimeout
            } else {
                AuthError::TokenExchangeFailed(e.to_string())
            }
        })?;

        self.credentials.save(credential.clone()).await?;
        info!(shop = %shop, "Shop authorized");

        let webhook_registered = match self
            .oauth
            .register_webhook(&credential, ORDERS_CREATE_TOPIC, &self.webhook_address)
            .await
        {
            Ok(()) => {
                info!(shop = %shop, "Registered orders/create webhook");
                true
            }
            Err(e) => {
                warn!(shop = %shop, error = %e, "Webhook registration failed, continuing install");
                false
            }
        };

        Ok(Authorized {
            shop,
            webhook_registered,
        })
    }

    fn check_state(
        &self,
        query: &CallbackQuery,
        issued: Option<&AuthorizationState>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let (Some(presented), Some(issued)) = (query.get("state"), issued) else {
            warn!("OAuth callback without state");
            return Err(AuthError::CsrfMismatch);
        };

        if !signature::constant_time_eq(presented, issued.value()) {
            warn!("OAuth state mismatch, possible CSRF attempt");
            return Err(AuthError::CsrfMismatch);
        }

        if issued.is_expired(self.state_ttl, now) {
            warn!(shop = %issued.shop, "OAuth state expired");
            return Err(AuthError::CsrfMismatch);
        }

        if query.get("shop").map(str::to_ascii_lowercase).as_deref() != Some(issued.shop.as_str()) {
            warn!(shop = %issued.shop, "OAuth callback for a different shop than the install");
            return Err(AuthError::CsrfMismatch);
        }

        Ok(())
    }
}
