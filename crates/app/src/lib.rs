//! Autodiscount - Shopify app that applies merchant-defined discounts to new
//! orders.
//!
//! # Flow
//!
//! 1. A merchant installs the app through `/auth/install`. The OAuth callback
//!    is checked for CSRF and signature, the code is exchanged for an access
//!    token, and an `orders/create` webhook is registered.
//! 2. The merchant manages discount configurations under `/discount`. Each
//!    one is mirrored by a Shopify price rule.
//! 3. Shopify posts every new order to the webhook. After the signature
//!    checks out, the first matching configuration is applied to the order.
//!
//! Credentials and configurations are kept per shop.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`shopify`] - Shopify REST Admin API client
//! - [`services`] - Install flow, discount management, order processing
//! - [`routes`] - Axum handlers
//! - [`middleware`] - Sessions and security headers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::AppConfig;
pub use error::AppError;
pub use routes::router;
pub use state::AppState;
