use uuid::Uuid;

use crate::domain::order::OrderError;
use crate::loading::LoadError;
use crate::store::StoreError;

// ============================================================================
// Service Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Member {0} not found")]
    MemberNotFound(Uuid),

    #[error("Item {0} not found")]
    ItemNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
