//! Order record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderStatus;

// ============================================================================
// Line Items
// ============================================================================

/// A single ordered item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    /// Item identifier
    pub item_id: Uuid,
    /// Ordered quantity (always > 0 for accepted orders)
    pub quantity: u32,
}

impl LineItem {
    pub fn new(item_id: Uuid, quantity: u32) -> Self {
        Self { item_id, quantity }
    }
}

// ============================================================================
// Order
// ============================================================================

/// Persisted order record
///
/// `order_id`, `customer_id` and `line_items` are fixed at creation. Only the
/// lifecycle timestamps change afterwards, and the storage layer always
/// overwrites the whole record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItem>,
    pub created_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a freshly created order (only `created_at` set)
    pub fn new(
        order_id: u64,
        customer_id: Uuid,
        line_items: Vec<LineItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            customer_id,
            line_items,
            created_at: Some(created_at),
            shipped_at: None,
            completed_at: None,
        }
    }

    /// Lifecycle stage derived from which timestamps are present
    pub fn status(&self) -> OrderStatus {
        if self.completed_at.is_some() {
            OrderStatus::Completed
        } else if self.shipped_at.is_some() {
            OrderStatus::Shipped
        } else {
            OrderStatus::Created
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Order {
        Order::new(
            42,
            Uuid::new_v4(),
            vec![LineItem::new(Uuid::new_v4(), 2), LineItem::new(Uuid::new_v4(), 3)],
            Utc::now(),
        )
    }

    #[test]
    fn test_json_field_names() {
        let order = sample();
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["order_id"], 42);
        assert!(json["customer_id"].is_string());
        assert_eq!(json["line_items"][0]["quantity"], 2);
        assert!(json["shipped_at"].is_null());
        assert!(json["completed_at"].is_null());
    }

    #[test]
    fn test_status_follows_timestamps() {
        let mut order = sample();
        assert_eq!(order.status(), OrderStatus::Created);

        order.shipped_at = Some(Utc::now());
        assert_eq!(order.status(), OrderStatus::Shipped);

        order.completed_at = Some(Utc::now());
        assert_eq!(order.status(), OrderStatus::Completed);
    }
}
