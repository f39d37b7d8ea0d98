// ============================================================================
// Domain Layer - Aggregate Model
// ============================================================================
//
// Order is the aggregate root. It owns its Delivery and its OrderItems and
// refers to a Member and to catalog Items it does not own.
//
// This layer knows nothing about how aggregates are stored or loaded.
//
// ============================================================================

pub mod order;
pub mod member;
pub mod delivery;
pub mod catalog;
