// ============================================================================
// Catalog Domain - Items referenced by order lines
// ============================================================================
//
// - Item: tagged record over the catalog variants (book, album, movie)
// - Catalog: identity map of items keyed by id, owner of stock changes
// - CatalogError: stock and lookup failures
//
// ============================================================================

pub mod item;
pub mod errors;
pub mod catalog;

pub use item::*;
pub use errors::*;
pub use catalog::*;
