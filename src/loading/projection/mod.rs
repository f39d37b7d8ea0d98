// ============================================================================
// Projection - Transfer shapes selected straight from the store
// ============================================================================
//
// No aggregate is materialized: the store returns only the columns the API
// shape needs.
//
// - PerOrderProjection: order rows, then one line query per order (1 + N)
// - TwoStepProjection: order rows, then lines for the whole id set, merged
//   by order id
// - FlatProjection: one (order × line) row each, grouped in memory
// - SimpleOrderProjection: order rows with to-one columns only
//
// ============================================================================

mod dto;
mod flat;
mod per_order;
mod simple;
mod two_step;

pub use dto::{OrderDto, OrderItemDto, SimpleOrderDto};
pub use flat::{group_flat_rows, FlatProjection};
pub use per_order::PerOrderProjection;
pub use simple::SimpleOrderProjection;
pub use two_step::TwoStepProjection;
