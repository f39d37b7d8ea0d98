use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::catalog::{Catalog, CatalogError, Item};

/// One line of an order. Only built by `Order::place` or by the loaders
/// when rehydrating a stored order, so `order_id` always names the order
/// whose `order_items` contain this line.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    id: Uuid,
    order_id: Uuid,
    item: Arc<Item>,
    order_price: i64,
    count: i32,
}

impl OrderItem {
    pub(crate) fn restore(id: Uuid, order_id: Uuid, item: Arc<Item>, order_price: i64, count: i32) -> Self {
        Self {
            id,
            order_id,
            item,
            order_price,
            count,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn item(&self) -> &Arc<Item> {
        &self.item
    }

    pub fn item_id(&self) -> Uuid {
        self.item.id
    }

    /// Unit price recorded when the order was placed
    pub fn order_price(&self) -> i64 {
        self.order_price
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn total_price(&self) -> i64 {
        self.order_price * i64::from(self.count)
    }

    /// Put this line's count back into stock
    pub fn cancel(&self, catalog: &mut Catalog) -> Result<(), CatalogError> {
        catalog.add_stock(&self.item.id, self.count)
    }
}
