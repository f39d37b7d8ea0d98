use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub address: Address,
}

impl Member {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            address,
        }
    }
}
