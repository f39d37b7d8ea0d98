use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::catalog::{Catalog, CatalogError};
use crate::domain::delivery::Delivery;
use crate::domain::member::Member;
use super::errors::OrderError;
use super::order_item::OrderItem;
use super::value_objects::{OrderLine, OrderStatus};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// An order owns its delivery and its order items; it refers to its member
// and to catalog items through shared handles. The only ways to obtain an
// `Order` are `Order::place` (new orders) and the loaders (stored orders),
// both of which hand out fully wired aggregates.
//
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    id: Uuid,
    version: i64,
    member: Arc<Member>,
    delivery: Delivery,
    order_items: Vec<OrderItem>,
    order_date: DateTime<Utc>,
    status: OrderStatus,
}

impl Order {
    /// Place a new order.
    ///
    /// Stock for every line is checked against `catalog` before anything is
    /// taken, so a failing line leaves all stock untouched. On success the
    /// stock is decremented, each line is priced at the item's current
    /// price, and the order is stamped `ORDERED` with the current time.
    pub fn place(
        member: Arc<Member>,
        delivery: Delivery,
        lines: &[OrderLine],
        catalog: &mut Catalog,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyItems);
        }

        let mut requested: HashMap<Uuid, i32> = HashMap::new();
        for line in lines {
            if line.count <= 0 {
                return Err(OrderError::InvalidQuantity(line.count));
            }
            let total = requested.entry(line.item_id).or_default();
            *total = total
                .checked_add(line.count)
                .ok_or(OrderError::InvalidQuantity(line.count))?;
        }
        for (item_id, count) in &requested {
            catalog.check_stock(item_id, *count)?;
        }

        let id = Uuid::now_v7();
        let mut order_items = Vec::with_capacity(lines.len());
        for line in lines {
            catalog.remove_stock(&line.item_id, line.count)?;
            let item = catalog
                .get(&line.item_id)
                .cloned()
                .ok_or(CatalogError::UnknownItem(line.item_id))?;
            let order_price = item.price;
            order_items.push(OrderItem::restore(Uuid::now_v7(), id, item, order_price, line.count));
        }

        Ok(Self {
            id,
            version: 0,
            member,
            delivery,
            order_items,
            order_date: Utc::now(),
            status: OrderStatus::Ordered,
        })
    }

    /// Cancel the order and put every line back into stock.
    ///
    /// Rejected when the delivery is completed or the order is already
    /// cancelled. All preconditions are checked before the first change, so
    /// a rejected cancel leaves both the order and the catalog as they were.
    pub fn cancel(&mut self, catalog: &mut Catalog) -> Result<(), OrderError> {
        if self.delivery.is_completed() {
            return Err(OrderError::AlreadyCompleted(self.id));
        }
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyCancelled(self.id));
        }
        if let Some(missing) = self
            .order_items
            .iter()
            .find(|order_item| !catalog.contains(&order_item.item_id()))
        {
            return Err(CatalogError::UnknownItem(missing.item_id()).into());
        }

        self.status = OrderStatus::Cancelled;
        for order_item in &self.order_items {
            order_item.cancel(catalog)?;
        }
        Ok(())
    }

    /// Sum of unit price × count over all lines
    pub fn total_price(&self) -> i64 {
        self.order_items.iter().map(OrderItem::total_price).sum()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn member(&self) -> &Arc<Member> {
        &self.member
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    pub fn order_items(&self) -> &[OrderItem] {
        &self.order_items
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }
}

/// To-one part of a stored order, read before its items are attached.
///
/// Loaders collect headers first and turn them into `Order`s only once the
/// item sequence is known, so no caller ever sees an order without its items.
#[derive(Debug, Clone)]
pub(crate) struct OrderHeader {
    pub id: Uuid,
    pub version: i64,
    pub member: Arc<Member>,
    pub delivery: Delivery,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}

impl OrderHeader {
    pub fn with_items(self, order_items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            version: self.version,
            member: self.member,
            delivery: self.delivery,
            order_items,
            order_date: self.order_date,
            status: self.status,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Item;
    use crate::domain::delivery::DeliveryStatus;
    use crate::domain::member::Address;

    fn create_test_member() -> Arc<Member> {
        Arc::new(Member::new(
            "member1",
            Address::new("Seoul", "Riverside 1", "123-123"),
        ))
    }

    fn create_delivery(status: DeliveryStatus) -> Delivery {
        let mut delivery = Delivery::ready(Address::new("Seoul", "Riverside 1", "123-123"));
        delivery.status = status;
        delivery
    }

    fn catalog_with(items: &[Item]) -> Catalog {
        let mut catalog = Catalog::new();
        for item in items {
            catalog.intern(item.clone());
        }
        catalog
    }

    #[test]
    fn test_place_order_wires_everything() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let mut catalog = catalog_with(&[book.clone()]);

        let order = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[OrderLine::new(book.id, 2)],
            &mut catalog,
        )
        .unwrap();

        assert_eq!(order.status(), OrderStatus::Ordered);
        assert_eq!(order.order_items().len(), 1);
        assert_eq!(order.total_price(), 20_000);
        assert!(order.order_items().iter().all(|oi| oi.order_id() == order.id()));
        assert_eq!(catalog.get(&book.id).unwrap().stock_quantity, 8);
    }

    #[test]
    fn test_place_order_with_insufficient_stock_fails() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let mut catalog = catalog_with(&[book.clone()]);

        let result = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[OrderLine::new(book.id, 11)],
            &mut catalog,
        );

        assert!(matches!(
            result,
            Err(OrderError::Catalog(CatalogError::NotEnoughStock { requested: 11, available: 10, .. }))
        ));
        assert_eq!(catalog.get(&book.id).unwrap().stock_quantity, 10);
    }

    #[test]
    fn test_place_order_checks_combined_lines_before_taking_stock() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let spring_book = Item::book("Spring Data", 20_000, 3);
        let mut catalog = catalog_with(&[book.clone(), spring_book.clone()]);

        let result = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[
                OrderLine::new(book.id, 6),
                OrderLine::new(spring_book.id, 1),
                OrderLine::new(book.id, 5),
            ],
            &mut catalog,
        );

        assert!(matches!(
            result,
            Err(OrderError::Catalog(CatalogError::NotEnoughStock { requested: 11, .. }))
        ));
        assert_eq!(catalog.get(&book.id).unwrap().stock_quantity, 10);
        assert_eq!(catalog.get(&spring_book.id).unwrap().stock_quantity, 3);
    }

    #[test]
    fn test_place_order_rejects_empty_and_non_positive_lines() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let mut catalog = catalog_with(&[book.clone()]);

        let empty = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[],
            &mut catalog,
        );
        assert!(matches!(empty, Err(OrderError::EmptyItems)));

        let zero = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[OrderLine::new(book.id, 0)],
            &mut catalog,
        );
        assert!(matches!(zero, Err(OrderError::InvalidQuantity(0))));
    }

    #[test]
    fn test_place_order_rejects_overflowing_combined_lines() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let mut catalog = catalog_with(&[book.clone()]);

        let result = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[OrderLine::new(book.id, i32::MAX), OrderLine::new(book.id, 1)],
            &mut catalog,
        );

        assert!(matches!(result, Err(OrderError::InvalidQuantity(1))));
        assert_eq!(catalog.get(&book.id).unwrap().stock_quantity, 10);
    }

    #[test]
    fn test_cancel_restocks_every_line_and_keeps_prices() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let spring_book = Item::book("Spring Data", 20_000, 5);
        let mut catalog = catalog_with(&[book.clone(), spring_book.clone()]);

        let mut order = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[OrderLine::new(book.id, 2), OrderLine::new(spring_book.id, 3)],
            &mut catalog,
        )
        .unwrap();
        let total_before = order.total_price();
        assert_eq!(total_before, 2 * 10_000 + 3 * 20_000);

        order.cancel(&mut catalog).unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.total_price(), total_before);
        assert_eq!(catalog.get(&book.id).unwrap().stock_quantity, 10);
        assert_eq!(catalog.get(&spring_book.id).unwrap().stock_quantity, 5);
    }

    #[test]
    fn test_cancel_with_completed_delivery_fails_without_side_effects() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let mut catalog = catalog_with(&[book.clone()]);

        let mut order = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Comp),
            &[OrderLine::new(book.id, 2)],
            &mut catalog,
        )
        .unwrap();

        let result = order.cancel(&mut catalog);

        assert_eq!(result, Err(OrderError::AlreadyCompleted(order.id())));
        assert_eq!(order.status(), OrderStatus::Ordered);
        assert_eq!(catalog.get(&book.id).unwrap().stock_quantity, 8);
    }

    #[test]
    fn test_cancel_twice_fails() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let mut catalog = catalog_with(&[book.clone()]);

        let mut order = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[OrderLine::new(book.id, 2)],
            &mut catalog,
        )
        .unwrap();

        order.cancel(&mut catalog).unwrap();
        let result = order.cancel(&mut catalog);

        assert_eq!(result, Err(OrderError::AlreadyCancelled(order.id())));
        assert_eq!(catalog.get(&book.id).unwrap().stock_quantity, 10);
    }

    #[test]
    fn test_cancel_with_item_missing_from_catalog_changes_nothing() {
        let book = Item::book("JPA Basics", 10_000, 10);
        let spring_book = Item::book("Spring Data", 20_000, 5);
        let mut catalog = catalog_with(&[book.clone(), spring_book.clone()]);

        let mut order = Order::place(
            create_test_member(),
            create_delivery(DeliveryStatus::Ready),
            &[OrderLine::new(book.id, 2), OrderLine::new(spring_book.id, 1)],
            &mut catalog,
        )
        .unwrap();

        let mut partial = catalog_with(&[catalog.get(&book.id).unwrap().as_ref().clone()]);
        let result = order.cancel(&mut partial);

        assert!(matches!(result, Err(OrderError::Catalog(CatalogError::UnknownItem(id))) if id == spring_book.id));
        assert_eq!(order.status(), OrderStatus::Ordered);
        assert_eq!(partial.get(&book.id).unwrap().stock_quantity, 8);
    }
}
