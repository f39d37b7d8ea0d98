use uuid::Uuid;

use crate::domain::catalog::CatalogError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Delivery already completed, cannot cancel order {0}")]
    AlreadyCompleted(Uuid),

    #[error("Order is already cancelled: {0}")]
    AlreadyCancelled(Uuid),

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid item count: {0}")]
    InvalidQuantity(i32),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
