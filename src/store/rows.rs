use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::catalog::Item;
use crate::domain::delivery::Delivery;
use crate::domain::member::{Address, Member};
use crate::domain::order::OrderStatus;

// ============================================================================
// Typed Rows - What each query shape returns
// ============================================================================
//
// Members, deliveries and catalog items come back as their domain values.
// Orders and order items come back as rows holding foreign keys; the
// loaders decide how those keys are resolved.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    pub id: Uuid,
    pub member_id: Uuid,
    pub delivery_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub order_price: i64,
    pub count: i32,
}

/// One row of `orders ⨝ member ⨝ delivery ⨝ order_items ⨝ item`.
/// An order with k items produces k of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderJoinRow {
    pub order: OrderRow,
    pub member: Member,
    pub delivery: Delivery,
    pub order_item: OrderItemRow,
    pub item: Item,
}

/// One row of `orders ⨝ member ⨝ delivery`; exactly one per order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderToOneRow {
    pub order: OrderRow,
    pub member: Member,
    pub delivery: Delivery,
}

/// Order-level columns selected straight into the transfer shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQueryRow {
    pub order_id: Uuid,
    pub member_name: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemQueryRow {
    pub order_id: Uuid,
    pub item_name: String,
    pub order_price: i64,
    pub count: i32,
}

/// Fully denormalized (order × item) row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFlatRow {
    pub order_id: Uuid,
    pub member_name: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub address: Address,
    pub order_item_id: Uuid,
    pub item_name: String,
    pub order_price: i64,
    pub count: i32,
}

impl From<&OrderJoinRow> for OrderFlatRow {
    fn from(row: &OrderJoinRow) -> Self {
        Self {
            order_id: row.order.id,
            member_name: row.member.name.clone(),
            order_date: row.order.order_date,
            status: row.order.status,
            address: row.delivery.address.clone(),
            order_item_id: row.order_item.id,
            item_name: row.item.name.clone(),
            order_price: row.order_item.order_price,
            count: row.order_item.count,
        }
    }
}
