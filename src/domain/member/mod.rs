// ============================================================================
// Member Domain - The customer placing orders
// ============================================================================
//
// A member is referenced by many orders but owned by none of them. Orders
// point at their member; the member keeps no list of orders. The orders of
// a member are looked up by id with `OrderSearch::by_member`, backed by an
// index on `orders.member_id`.
//
// ============================================================================

pub mod value_objects;
pub mod entity;

pub use value_objects::*;
pub use entity::*;
