use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::member::Address;

// ============================================================================
// Delivery - Owned exclusively by its Order
// ============================================================================
//
// A delivery is created together with its order and lives inside it. There
// is no back-reference: the order structurally contains the delivery.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Ready,
    Comp,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Ready => "READY",
            DeliveryStatus::Comp => "COMP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "READY" => Some(DeliveryStatus::Ready),
            "COMP" => Some(DeliveryStatus::Comp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub address: Address,
    pub status: DeliveryStatus,
}

impl Delivery {
    /// New delivery waiting to be shipped to `address`
    pub fn ready(address: Address) -> Self {
        Self {
            id: Uuid::now_v7(),
            address,
            status: DeliveryStatus::Ready,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == DeliveryStatus::Comp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_starts_ready() {
        let delivery = Delivery::ready(Address::new("Busan", "Haeundae-ro 2", "48000"));
        assert_eq!(delivery.status, DeliveryStatus::Ready);
        assert!(!delivery.is_completed());
    }

    #[test]
    fn test_delivery_status_round_trips_through_column_text() {
        for status in [DeliveryStatus::Ready, DeliveryStatus::Comp] {
            assert_eq!(DeliveryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeliveryStatus::parse("SHIPPED"), None);
    }

    #[test]
    fn test_delivery_status_serialization() {
        let json = serde_json::to_string(&DeliveryStatus::Comp).unwrap();
        assert_eq!(json, "\"COMP\"");
    }
}
