use uuid::Uuid;

use crate::domain::delivery::Delivery;
use crate::domain::order::{Order, OrderStatus};
use super::rows::{OrderItemRow, OrderRow};

// ============================================================================
// Change Set - Writes collected by a unit of work
// ============================================================================
//
// A store applies a whole change set atomically: either every change is
// written or none is.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Insert an order together with the delivery and items it owns
    InsertOrder {
        order: OrderRow,
        delivery: Delivery,
        order_items: Vec<OrderItemRow>,
    },

    /// Set the status and bump the version, only if the stored version
    /// still equals `expected_version`
    UpdateOrderStatus {
        order_id: Uuid,
        status: OrderStatus,
        expected_version: i64,
    },

    /// Add `delta` to the stock of an item; rejected if the result is negative
    AdjustStock { item_id: Uuid, delta: i32 },
}

impl Change {
    pub fn insert_order(order: &Order) -> Self {
        Change::InsertOrder {
            order: OrderRow {
                id: order.id(),
                member_id: order.member().id,
                delivery_id: order.delivery().id,
                order_date: order.order_date(),
                status: order.status(),
                version: order.version(),
            },
            delivery: order.delivery().clone(),
            order_items: order
                .order_items()
                .iter()
                .map(|order_item| OrderItemRow {
                    id: order_item.id(),
                    order_id: order.id(),
                    item_id: order_item.item_id(),
                    order_price: order_item.order_price(),
                    count: order_item.count(),
                })
                .collect(),
        }
    }

    pub fn update_status(order: &Order) -> Self {
        Change::UpdateOrderStatus {
            order_id: order.id(),
            status: order.status(),
            expected_version: order.version(),
        }
    }
}
