//! Unified error handling for HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::discounts::DiscountError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Install or OAuth callback failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Discount management or order processing failed.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Webhook signature missing or wrong.
    #[error("Webhook signature verification failed")]
    WebhookUnauthorized,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::MissingParameter(_)
                | AuthError::InvalidShopDomain(_)
                | AuthError::CsrfMismatch
                | AuthError::SignatureInvalid => StatusCode::BAD_REQUEST,
                AuthError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
                AuthError::TokenExchangeFailed(_)
                | AuthError::CredentialStore(_)
                | AuthError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Discount(err) => match err {
                DiscountError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                DiscountError::NotAuthorized => StatusCode::UNAUTHORIZED,
                DiscountError::NotFound(_) => StatusCode::NOT_FOUND,
                DiscountError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
                DiscountError::RemoteProvisioningFailed(_)
                | DiscountError::RemoteUpdateFailed(_)
                | DiscountError::RemoteDeleteFailed(_)
                | DiscountError::DiscountApplicationFailed(_)
                | DiscountError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::WebhookUnauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Upstream and storage details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Auth(AuthError::CsrfMismatch) => "Request origin cannot be verified".to_string(),
            Self::Auth(AuthError::SignatureInvalid) => "HMAC validation failed".to_string(),
            Self::Auth(AuthError::TokenExchangeFailed(_)) => {
                "Error requesting access token".to_string()
            }
            Self::Auth(AuthError::UpstreamTimeout) | Self::Discount(DiscountError::UpstreamTimeout) => {
                "Shopify did not respond in time".to_string()
            }
            Self::Discount(DiscountError::NotFound(_)) => {
                "Discount configuration not found".to_string()
            }
            Self::Discount(DiscountError::RemoteProvisioningFailed(_)) => {
                "Error creating discount".to_string()
            }
            Self::Discount(DiscountError::RemoteUpdateFailed(_)) => {
                "Error updating discount".to_string()
            }
            Self::Discount(DiscountError::RemoteDeleteFailed(_)) => {
                "Error deleting discount".to_string()
            }
            Self::Discount(DiscountError::DiscountApplicationFailed(_)) => {
                "Error applying discount".to_string()
            }
            Self::Auth(AuthError::CredentialStore(_) | AuthError::Session(_))
            | Self::Discount(DiscountError::Store(_))
            | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.public_message()).into_response()
    }
}
