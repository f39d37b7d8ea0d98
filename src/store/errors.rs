use uuid::Uuid;

// ============================================================================
// Store Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Concurrency conflict on order {order_id}: expected version {expected}, but current is {actual}")]
    VersionConflict {
        order_id: Uuid,
        expected: i64,
        actual: i64,
    },

    #[error("Stock for item {item_id} would become negative")]
    StockUnderflow { item_id: Uuid },

    #[error("Integrity violation: {0}")]
    Integrity(String),
}

impl StoreError {
    pub fn integrity(message: impl Into<String>) -> Self {
        StoreError::Integrity(message.into())
    }
}
