use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Ordered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Ordered => "ORDERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ORDERED" => Some(OrderStatus::Ordered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// One requested line when placing an order
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderLine {
    pub item_id: Uuid,
    pub count: i32,
}

impl OrderLine {
    pub fn new(item_id: Uuid, count: i32) -> Self {
        Self { item_id, count }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_serialization() {
        let json = serde_json::to_string(&OrderStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");

        let deserialized: OrderStatus = serde_json::from_str("\"ORDERED\"").unwrap();
        assert_eq!(deserialized, OrderStatus::Ordered);
    }

    #[test]
    fn test_order_status_column_text() {
        for status in [OrderStatus::Ordered, OrderStatus::Cancelled] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("SHIPPED"), None);
    }
}
