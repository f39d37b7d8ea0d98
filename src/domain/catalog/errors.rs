use uuid::Uuid;

// ============================================================================
// Catalog Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Not enough stock for item {item_id}: requested {requested}, available {available}")]
    NotEnoughStock {
        item_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Item not loaded in catalog: {0}")]
    UnknownItem(Uuid),

    #[error("Invalid stock quantity: {0}")]
    InvalidQuantity(i32),
}
