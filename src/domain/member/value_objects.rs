use serde::{Deserialize, Serialize};

// ============================================================================
// Member Value Objects
// ============================================================================

/// Postal address embedded in members and deliveries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zipcode: String,
}

impl Address {
    pub fn new(city: impl Into<String>, street: impl Into<String>, zipcode: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            street: street.into(),
            zipcode: zipcode.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_serialization() {
        let address = Address::new("Seoul", "Gangnam-daero 1", "06000");

        let json = serde_json::to_string(&address).unwrap();
        let deserialized: Address = serde_json::from_str(&json).unwrap();

        assert_eq!(address, deserialized);
        assert!(json.contains("\"zipcode\":\"06000\""));
    }
}
