// ============================================================================
// Store - The relational persistence collaborator
// ============================================================================
//
// Every loader talks to storage through the `Store` trait, one method per
// query shape. Loaders never call a store directly: they go through a
// `UnitOfWork`, which counts each call, keeps identity maps and collects
// writes until commit.
//
// Implementations:
// - InMemoryStore: tables in memory with SQL join semantics
// - PgStore: Postgres through sqlx
//
// ============================================================================

mod changes;
mod errors;
mod memory;
mod postgres;
mod rows;
mod search;
mod unit_of_work;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::catalog::Item;
use crate::domain::delivery::Delivery;
use crate::domain::member::Member;

pub use changes::Change;
pub use errors::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use rows::*;
pub use search::{InvalidPage, OrderSearch, Page};
pub use unit_of_work::{run_in_unit_of_work, QueryStats, UnitOfWork};

/// Query shapes issued against the store, used as instrumentation labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    Orders,
    Member,
    Delivery,
    OrderItems,
    Item,
    OrdersWithItems,
    OrdersWithMemberDelivery,
    OrderWithMemberDelivery,
    OrderItemsByOrderIds,
    ItemsByIds,
    OrderQueryRows,
    OrderItemQueryRows,
    OrderItemQueryRowsByOrderIds,
    OrderFlatRows,
    Apply,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Orders => "orders",
            QueryKind::Member => "member",
            QueryKind::Delivery => "delivery",
            QueryKind::OrderItems => "order_items",
            QueryKind::Item => "item",
            QueryKind::OrdersWithItems => "orders_with_items",
            QueryKind::OrdersWithMemberDelivery => "orders_with_member_delivery",
            QueryKind::OrderWithMemberDelivery => "order_with_member_delivery",
            QueryKind::OrderItemsByOrderIds => "order_items_by_order_ids",
            QueryKind::ItemsByIds => "items_by_ids",
            QueryKind::OrderQueryRows => "order_query_rows",
            QueryKind::OrderItemQueryRows => "order_item_query_rows",
            QueryKind::OrderItemQueryRowsByOrderIds => "order_item_query_rows_by_order_ids",
            QueryKind::OrderFlatRows => "order_flat_rows",
            QueryKind::Apply => "apply",
        }
    }
}

/// Parameterized queries returning typed rows.
///
/// Queries without an explicit ordering return rows in storage order;
/// queries taking a `Page` order roots by order id before slicing.
#[async_trait]
pub trait Store: Send + Sync {
    /// Root rows matching the filter
    async fn find_orders(&self, search: &OrderSearch) -> Result<Vec<OrderRow>, StoreError>;

    async fn find_member(&self, member_id: Uuid) -> Result<Option<Member>, StoreError>;

    async fn find_delivery(&self, delivery_id: Uuid) -> Result<Option<Delivery>, StoreError>;

    async fn find_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemRow>, StoreError>;

    async fn find_item(&self, item_id: Uuid) -> Result<Option<Item>, StoreError>;

    /// Orders joined with member, delivery, order items and their items.
    /// One row per order item; orders without items do not appear.
    async fn find_orders_with_items(&self, search: &OrderSearch) -> Result<Vec<OrderJoinRow>, StoreError>;

    /// Orders joined with their to-one relations only, ordered by order id
    async fn find_orders_with_member_delivery(
        &self,
        search: &OrderSearch,
        page: Option<Page>,
    ) -> Result<Vec<OrderToOneRow>, StoreError>;

    async fn find_order_with_member_delivery(&self, order_id: Uuid) -> Result<Option<OrderToOneRow>, StoreError>;

    async fn find_order_items_by_order_ids(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItemRow>, StoreError>;

    async fn find_items_by_ids(&self, item_ids: &[Uuid]) -> Result<Vec<Item>, StoreError>;

    async fn find_order_query_rows(&self, search: &OrderSearch) -> Result<Vec<OrderQueryRow>, StoreError>;

    async fn find_order_item_query_rows(&self, order_id: Uuid) -> Result<Vec<OrderItemQueryRow>, StoreError>;

    async fn find_order_item_query_rows_by_order_ids(
        &self,
        order_ids: &[Uuid],
    ) -> Result<Vec<OrderItemQueryRow>, StoreError>;

    /// One denormalized row per (order × item)
    async fn find_order_flat_rows(&self, search: &OrderSearch) -> Result<Vec<OrderFlatRow>, StoreError>;

    /// Write a change set atomically
    async fn apply(&self, changes: &[Change]) -> Result<(), StoreError>;
}
