//! Session middleware configuration.
//!
//! Sessions live in process memory. They hold two things: the OAuth state
//! between install and callback, and the shop a browser has connected.
//!
//! `SameSite=Lax` is required: Shopify's redirect to the callback is a
//! cross-site top-level navigation, and a `Strict` cookie would not be sent
//! with it.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "autodiscount_session";

/// Session key for the pending [`crate::services::auth::AuthorizationState`].
pub const OAUTH_STATE_KEY: &str = "oauth_state";

/// Session key for the [`autodiscount_core::ShopDomain`] authorized in this browser.
pub const CONNECTED_SHOP_KEY: &str = "connected_shop";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &AppConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
