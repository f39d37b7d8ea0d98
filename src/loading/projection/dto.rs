use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::member::Address;
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::store::{OrderItemQueryRow, OrderQueryRow, OrderToOneRow};

/// API shape of an order with its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub order_id: Uuid,
    /// Member name
    pub name: String,
    pub order_date: DateTime<Utc>,
    pub order_status: OrderStatus,
    /// Delivery address
    pub address: Address,
    pub order_items: Vec<OrderItemDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub item_name: String,
    pub order_price: i64,
    pub count: i32,
}

/// API shape of an order without its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleOrderDto {
    pub order_id: Uuid,
    pub name: String,
    pub order_date: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub address: Address,
}

impl From<&Order> for OrderDto {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id(),
            name: order.member().name.clone(),
            order_date: order.order_date(),
            order_status: order.status(),
            address: order.delivery().address.clone(),
            order_items: order.order_items().iter().map(OrderItemDto::from).collect(),
        }
    }
}

impl From<&OrderItem> for OrderItemDto {
    fn from(order_item: &OrderItem) -> Self {
        Self {
            item_name: order_item.item().name.clone(),
            order_price: order_item.order_price(),
            count: order_item.count(),
        }
    }
}

impl From<OrderItemQueryRow> for OrderItemDto {
    fn from(row: OrderItemQueryRow) -> Self {
        Self {
            item_name: row.item_name,
            order_price: row.order_price,
            count: row.count,
        }
    }
}

impl OrderDto {
    /// Order-level columns with lines still to be attached
    pub fn from_query_row(row: OrderQueryRow) -> Self {
        Self {
            order_id: row.order_id,
            name: row.member_name,
            order_date: row.order_date,
            order_status: row.status,
            address: row.address,
            order_items: Vec::new(),
        }
    }
}

impl From<OrderToOneRow> for SimpleOrderDto {
    fn from(row: OrderToOneRow) -> Self {
        Self {
            order_id: row.order.id,
            name: row.member.name,
            order_date: row.order.order_date,
            order_status: row.order.status,
            address: row.delivery.address,
        }
    }
}
