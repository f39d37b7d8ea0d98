// ============================================================================
// Service - Order placement, cancellation and read strategies
// ============================================================================
//
// Each call opens its own unit of work and closes it before returning.
// Writes commit through `run_in_unit_of_work`; reads commit an empty
// change set.
//
// ============================================================================

mod errors;
mod order_service;

pub use errors::ServiceError;
pub use order_service::OrderService;
