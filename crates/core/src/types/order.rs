//! Order event payload received from the `orders/create` webhook.
//!
//! Only the fields discount matching needs are modelled; everything else in
//! Shopify's order payload is ignored during deserialization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CollectionId, OrderId, ProductId};

/// An order as delivered by the `orders/create` webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Shopify order ID.
    pub id: OrderId,
    /// Order total. Shopify sends this as a decimal string (`"199.00"`).
    pub total_price: Decimal,
    /// Ordered items.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// A single line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product ID. `None` for custom line items.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// Collections the product belongs to, when the payload carries them.
    #[serde(default)]
    pub collection_ids: Vec<CollectionId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_deserialize_shopify_payload() {
        let payload = r#"{
            "id": 820982911946154508,
            "email": "jon@example.com",
            "total_price": "199.65",
            "currency": "USD",
            "line_items": [
                {"id": 1, "product_id": 632910392, "title": "IPod Nano", "price": "199.00"},
                {"id": 2, "product_id": null, "title": "Gift wrap", "price": "0.65"}
            ]
        }"#;

        let order: OrderEvent = serde_json::from_str(payload).unwrap();

        assert_eq!(order.id, OrderId::new(820_982_911_946_154_508));
        assert_eq!(order.total_price, dec!(199.65));
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(
            order.line_items.first().and_then(|i| i.product_id),
            Some(ProductId::new(632_910_392))
        );
        assert!(order.line_items.iter().all(|i| i.collection_ids.is_empty()));
    }

    #[test]
    fn test_deserialize_numeric_total() {
        let order: OrderEvent =
            serde_json::from_str(r#"{"id": 1, "total_price": 40}"#).unwrap();

        assert_eq!(order.total_price, dec!(40));
        assert!(order.line_items.is_empty());
    }
}
