//! Discount selection for incoming orders.
//!
//! Configurations are evaluated in store order (insertion order) and the
//! first one whose conditions hold wins. There is no priority field:
//! insertion order is the priority. Selection is total and side-effect free,
//! so the same order against the same configurations always picks the same
//! discount.

use crate::types::{DiscountConfiguration, OrderEvent};

/// Return the first configuration that applies to `order`, if any.
///
/// Later configurations are never consulted once one matches, even if they
/// would give the customer a larger discount.
#[must_use]
pub fn find_match<'a>(
    order: &OrderEvent,
    configurations: &'a [DiscountConfiguration],
) -> Option<&'a DiscountConfiguration> {
    configurations.iter().find(|config| config.matches(order))
}
