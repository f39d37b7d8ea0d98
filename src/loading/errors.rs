use uuid::Uuid;

use crate::store::{InvalidPage, StoreError};
use super::fetch_plan::Relation;

// ============================================================================
// Loader Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid page: offset {offset} must be >= 0 and limit {limit} must be > 0")]
    InvalidPage { offset: i64, limit: i64 },

    #[error("Invalid batch size {0}: must be between 1 and 1000")]
    InvalidBatchSize(usize),

    #[error("Cannot join more than one collection in a single query: {0:?}")]
    CompoundCollectionFetch(Vec<Relation>),

    #[error("Relation {0:?} cannot be fetched by this loader")]
    UnsupportedRelation(Relation),

    #[error("Plan leaves out relations this loader always joins: {0:?}")]
    IncompletePlan(Vec<Relation>),

    #[error("Order item {order_item_id} of order {order_id} appears twice with different content")]
    DuplicateKey { order_id: Uuid, order_item_id: Uuid },

    #[error("Rows for order {order_id} disagree on order-level fields")]
    InconsistentRoot { order_id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InvalidPage> for LoadError {
    fn from(e: InvalidPage) -> Self {
        LoadError::InvalidPage {
            offset: e.offset,
            limit: e.limit,
        }
    }
}

impl LoadError {
    /// Rejected before any query was issued
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LoadError::InvalidPage { .. }
                | LoadError::InvalidBatchSize(_)
                | LoadError::CompoundCollectionFetch(_)
                | LoadError::UnsupportedRelation(_)
                | LoadError::IncompletePlan(_)
        )
    }
}
