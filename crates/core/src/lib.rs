//! Autodiscount Core - Shared domain types.
//!
//! This crate provides the types used by the autodiscount app:
//! - `app` - Shopify OAuth install flow, discount management API and the
//!   order webhook receiver
//! - `integration-tests` - In-process HTTP tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no locking. Matching an order against discount rules lives here
//! because it is deterministic and side-effect free.
//!
//! # Modules
//!
//! - [`types`] - Shop domains, typed IDs, discount configurations and order events
//! - [`matching`] - First-match selection of a discount for an order

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod matching;
pub mod types;

pub use matching::find_match;
pub use types::*;
