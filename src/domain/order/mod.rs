// ============================================================================
// Order Domain - The Order aggregate
// ============================================================================
//
// - Value objects (OrderStatus, OrderLine)
// - Errors (OrderError enum)
// - OrderItem (owned line, created only through the aggregate)
// - Aggregate (Order with placement, cancellation and pricing)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod order_item;
pub mod aggregate;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use order_item::*;
pub use aggregate::Order;
pub(crate) use aggregate::OrderHeader;
