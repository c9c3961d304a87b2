//! Business logic behind the HTTP routes.
//!
//! - [`auth`] - Install flow: consent redirect and OAuth callback
//! - [`credentials`] - Per-shop access tokens
//! - [`discounts`] - Discount configuration CRUD mirrored to Shopify price rules
//! - [`orders`] - Applying a matching discount to a newly created order
//! - [`signature`] - HMAC verification of callbacks and webhooks

pub mod auth;
pub mod credentials;
pub mod discounts;
pub mod orders;
pub mod signature;

use thiserror::Error;

/// Failure of a credential or discount store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same key already exists.
    #[error("Duplicate record: {0}")]
    Conflict(String),
}
