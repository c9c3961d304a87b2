//! Install flow errors.

use thiserror::Error;

use autodiscount_core::ShopDomainError;

use crate::services::StoreError;

/// Reasons an install or OAuth callback is rejected.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid shop domain: {0}")]
    InvalidShopDomain(#[from] ShopDomainError),

    /// Presented state is missing, differs from the issued one, or expired.
    #[error("OAuth state mismatch")]
    CsrfMismatch,

    #[error("OAuth callback signature is invalid")]
    SignatureInvalid,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Token exchange timed out")]
    UpstreamTimeout,

    #[error("Failed to store credential: {0}")]
    CredentialStore(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(String),
}
