//! Core types for autodiscount.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod discount;
pub mod id;
pub mod order;
pub mod shop;

pub use discount::{DiscountConfiguration, DiscountKind, DiscountSpec, DiscountSpecError};
pub use id::*;
pub use order::{LineItem, OrderEvent};
pub use shop::{ShopDomain, ShopDomainError};
