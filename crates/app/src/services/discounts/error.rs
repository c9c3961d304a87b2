//! Discount management errors.

use thiserror::Error;

use autodiscount_core::{DiscountId, DiscountSpecError};

use crate::services::StoreError;
use crate::shopify::ShopifyError;

/// Reasons a discount operation fails.
#[derive(Debug, Error)]
pub enum DiscountError {
    #[error("Invalid discount: {0}")]
    InvalidInput(#[from] DiscountSpecError),

    /// No access credential for the shop.
    #[error("Shop has not authorized this app")]
    NotAuthorized,

    #[error("Discount configuration not found: {0}")]
    NotFound(DiscountId),

    #[error("Failed to create price rule: {0}")]
    RemoteProvisioningFailed(String),

    #[error("Failed to update price rule: {0}")]
    RemoteUpdateFailed(String),

    #[error("Failed to delete price rule: {0}")]
    RemoteDeleteFailed(String),

    #[error("Failed to apply discount to order: {0}")]
    DiscountApplicationFailed(String),

    #[error("Shopify did not respond in time")]
    UpstreamTimeout,

    #[error("Discount store error: {0}")]
    Store(#[from] StoreError),
}

impl DiscountError {
    /// Map a Shopify failure, keeping timeouts distinct.
    pub(crate) fn remote(err: &ShopifyError, wrap: fn(String) -> Self) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout
        } else {
            wrap(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_keeps_timeouts_distinct() {
        assert!(matches!(
            DiscountError::remote(&ShopifyError::Timeout, DiscountError::RemoteUpdateFailed),
            DiscountError::UpstreamTimeout
        ));

        let err = DiscountError::remote(
            &ShopifyError::Status {
                status: 422,
                body: "bad".to_string(),
            },
            DiscountError::RemoteUpdateFailed,
        );
        assert!(matches!(err, DiscountError::RemoteUpdateFailed(msg) if msg.contains("422")));
    }
}
