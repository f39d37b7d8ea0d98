use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::domain::catalog::Item;
use crate::domain::delivery::{Delivery, DeliveryStatus};
use crate::domain::member::Member;
use super::changes::Change;
use super::errors::StoreError;
use super::rows::*;
use super::search::{OrderSearch, Page};
use super::Store;

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Tables are plain vectors. Reads return rows in the order the Postgres
// queries ask for: orders by order id, lines by (order id, order item id).
// Joins are inner joins with the same row multiplication a relational
// database produces: an order with k items yields k joined rows.
//
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Tables {
    members: Vec<Member>,
    deliveries: Vec<Delivery>,
    orders: Vec<OrderRow>,
    order_items: Vec<OrderItemRow>,
    items: Vec<Item>,
}

impl Tables {
    fn member(&self, id: Uuid) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    fn delivery(&self, id: Uuid) -> Option<&Delivery> {
        self.deliveries.iter().find(|d| d.id == id)
    }

    fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    fn items_of(&self, order_id: Uuid) -> Vec<&OrderItemRow> {
        self.items_of_orders(&[order_id])
    }

    /// Lines of the given orders, ordered by order id, then order item id
    fn items_of_orders(&self, order_ids: &[Uuid]) -> Vec<&OrderItemRow> {
        let wanted: HashSet<&Uuid> = order_ids.iter().collect();
        let mut rows: Vec<&OrderItemRow> = self
            .order_items
            .iter()
            .filter(|oi| wanted.contains(&oi.order_id))
            .collect();
        rows.sort_by_key(|oi| (oi.order_id, oi.id));
        rows
    }

    /// Orders passing the filter, joined with member and delivery
    fn to_one_rows(&self, search: &OrderSearch) -> Vec<OrderToOneRow> {
        let mut rows: Vec<OrderToOneRow> = self
            .orders
            .iter()
            .filter_map(|order| {
                let member = self.member(order.member_id)?;
                let delivery = self.delivery(order.delivery_id)?;
                search.matches(member, order.status).then(|| OrderToOneRow {
                    order: order.clone(),
                    member: member.clone(),
                    delivery: delivery.clone(),
                })
            })
            .collect();
        rows.sort_by_key(|row| row.order.id);
        rows
    }

    fn join_rows(&self, search: &OrderSearch) -> Vec<OrderJoinRow> {
        let mut rows = Vec::new();
        for root in self.to_one_rows(search) {
            for order_item in self.items_of(root.order.id) {
                if let Some(item) = self.item(order_item.item_id) {
                    rows.push(OrderJoinRow {
                        order: root.order.clone(),
                        member: root.member.clone(),
                        delivery: root.delivery.clone(),
                        order_item: order_item.clone(),
                        item: item.clone(),
                    });
                }
            }
        }
        rows
    }

    fn item_query_rows(&self, order_item_rows: Vec<&OrderItemRow>) -> Vec<OrderItemQueryRow> {
        order_item_rows
            .into_iter()
            .filter_map(|order_item| {
                let item = self.item(order_item.item_id)?;
                Some(OrderItemQueryRow {
                    order_id: order_item.order_id,
                    item_name: item.name.clone(),
                    order_price: order_item.order_price,
                    count: order_item.count,
                })
            })
            .collect()
    }

    fn apply(&mut self, change: &Change) -> Result<(), StoreError> {
        match change {
            Change::InsertOrder { order, delivery, order_items } => {
                if self.orders.iter().any(|o| o.id == order.id) {
                    return Err(StoreError::integrity(format!("duplicate order id {}", order.id)));
                }
                if self.member(order.member_id).is_none() {
                    return Err(StoreError::integrity(format!("unknown member {}", order.member_id)));
                }
                if let Some(missing) = order_items.iter().find(|oi| self.item(oi.item_id).is_none()) {
                    return Err(StoreError::integrity(format!("unknown item {}", missing.item_id)));
                }
                self.deliveries.push(delivery.clone());
                self.orders.push(order.clone());
                self.order_items.extend(order_items.iter().cloned());
            }
            Change::UpdateOrderStatus { order_id, status, expected_version } => {
                let order = self
                    .orders
                    .iter_mut()
                    .find(|o| o.id == *order_id)
                    .ok_or_else(|| StoreError::integrity(format!("unknown order {}", order_id)))?;
                if order.version != *expected_version {
                    return Err(StoreError::VersionConflict {
                        order_id: *order_id,
                        expected: *expected_version,
                        actual: order.version,
                    });
                }
                order.status = *status;
                order.version += 1;
            }
            Change::AdjustStock { item_id, delta } => {
                let item = self
                    .items
                    .iter_mut()
                    .find(|i| i.id == *item_id)
                    .ok_or_else(|| StoreError::integrity(format!("unknown item {}", item_id)))?;
                let stock = item.stock_quantity + delta;
                if stock < 0 {
                    return Err(StoreError::StockUnderflow { item_id: *item_id });
                }
                item.stock_quantity = stock;
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory store for tests and the demo binary
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::integrity("in-memory tables lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::integrity("in-memory tables lock poisoned"))
    }

    pub fn insert_member(&self, member: &Member) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.member(member.id).is_some() {
            return Err(StoreError::integrity(format!("duplicate member id {}", member.id)));
        }
        tables.members.push(member.clone());
        Ok(())
    }

    pub fn insert_item(&self, item: &Item) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.item(item.id).is_some() {
            return Err(StoreError::integrity(format!("duplicate item id {}", item.id)));
        }
        tables.items.push(item.clone());
        Ok(())
    }

    /// Mark the delivery of an order as completed
    pub fn complete_delivery(&self, order_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let delivery_id = tables
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| o.delivery_id)
            .ok_or_else(|| StoreError::integrity(format!("unknown order {}", order_id)))?;
        if let Some(delivery) = tables.deliveries.iter_mut().find(|d| d.id == delivery_id) {
            delivery.status = DeliveryStatus::Comp;
        }
        Ok(())
    }

    /// Current stored state of an item, bypassing any unit of work
    pub fn stored_item(&self, item_id: Uuid) -> Result<Option<Item>, StoreError> {
        Ok(self.read()?.item(item_id).cloned())
    }

    /// Current stored state of an order row, bypassing any unit of work
    pub fn stored_order(&self, order_id: Uuid) -> Result<Option<OrderRow>, StoreError> {
        Ok(self.read()?.orders.iter().find(|o| o.id == order_id).cloned())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_orders(&self, search: &OrderSearch) -> Result<Vec<OrderRow>, StoreError> {
        let tables = self.read()?;
        let mut orders: Vec<OrderRow> = tables
            .orders
            .iter()
            .filter(|order| {
                tables
                    .member(order.member_id)
                    .is_some_and(|member| search.matches(member, order.status))
            })
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }

    async fn find_member(&self, member_id: Uuid) -> Result<Option<Member>, StoreError> {
        Ok(self.read()?.member(member_id).cloned())
    }

    async fn find_delivery(&self, delivery_id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(self.read()?.delivery(delivery_id).cloned())
    }

    async fn find_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemRow>, StoreError> {
        Ok(self.read()?.items_of(order_id).into_iter().cloned().collect())
    }

    async fn find_item(&self, item_id: Uuid) -> Result<Option<Item>, StoreError> {
        Ok(self.read()?.item(item_id).cloned())
    }

    async fn find_orders_with_items(&self, search: &OrderSearch) -> Result<Vec<OrderJoinRow>, StoreError> {
        Ok(self.read()?.join_rows(search))
    }

    async fn find_orders_with_member_delivery(
        &self,
        search: &OrderSearch,
        page: Option<Page>,
    ) -> Result<Vec<OrderToOneRow>, StoreError> {
        let rows = self.read()?.to_one_rows(search);
        Ok(match page {
            Some(page) => page.slice(rows),
            None => rows,
        })
    }

    async fn find_order_with_member_delivery(&self, order_id: Uuid) -> Result<Option<OrderToOneRow>, StoreError> {
        Ok(self
            .read()?
            .to_one_rows(&OrderSearch::all())
            .into_iter()
            .find(|row| row.order.id == order_id))
    }

    async fn find_order_items_by_order_ids(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItemRow>, StoreError> {
        Ok(self
            .read()?
            .items_of_orders(order_ids)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn find_items_by_ids(&self, item_ids: &[Uuid]) -> Result<Vec<Item>, StoreError> {
        let wanted: HashSet<&Uuid> = item_ids.iter().collect();
        Ok(self
            .read()?
            .items
            .iter()
            .filter(|item| wanted.contains(&item.id))
            .cloned()
            .collect())
    }

    async fn find_order_query_rows(&self, search: &OrderSearch) -> Result<Vec<OrderQueryRow>, StoreError> {
        Ok(self
            .read()?
            .to_one_rows(search)
            .into_iter()
            .map(|row| OrderQueryRow {
                order_id: row.order.id,
                member_name: row.member.name,
                order_date: row.order.order_date,
                status: row.order.status,
                address: row.delivery.address,
            })
            .collect())
    }

    async fn find_order_item_query_rows(&self, order_id: Uuid) -> Result<Vec<OrderItemQueryRow>, StoreError> {
        let tables = self.read()?;
        Ok(tables.item_query_rows(tables.items_of(order_id)))
    }

    async fn find_order_item_query_rows_by_order_ids(
        &self,
        order_ids: &[Uuid],
    ) -> Result<Vec<OrderItemQueryRow>, StoreError> {
        let tables = self.read()?;
        Ok(tables.item_query_rows(tables.items_of_orders(order_ids)))
    }

    async fn find_order_flat_rows(&self, search: &OrderSearch) -> Result<Vec<OrderFlatRow>, StoreError> {
        Ok(self
            .read()?
            .join_rows(search)
            .iter()
            .map(OrderFlatRow::from)
            .collect())
    }

    async fn apply(&self, changes: &[Change]) -> Result<(), StoreError> {
        let mut tables = self.write()?;

        // Work on a copy so a failing change leaves the tables untouched
        let mut next = tables.clone();
        for change in changes {
            next.apply(change)?;
        }
        *tables = next;

        tracing::debug!(change_count = changes.len(), "Applied change set to in-memory store");
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::domain::member::Address;
    use crate::domain::order::OrderStatus;

    async fn seed_order(store: &InMemoryStore, member: &Member, items: &[(&Item, i32)]) -> Uuid {
        let delivery = Delivery::ready(member.address.clone());
        let order_id = Uuid::now_v7();
        let change = Change::InsertOrder {
            order: OrderRow {
                id: order_id,
                member_id: member.id,
                delivery_id: delivery.id,
                order_date: Utc::now(),
                status: OrderStatus::Ordered,
                version: 0,
            },
            delivery,
            order_items: items
                .iter()
                .map(|(item, count)| OrderItemRow {
                    id: Uuid::now_v7(),
                    order_id,
                    item_id: item.id,
                    order_price: item.price,
                    count: *count,
                })
                .collect(),
        };
        store.apply(&[change]).await.unwrap();
        order_id
    }

    fn seeded() -> (InMemoryStore, Member, Item, Item) {
        let store = InMemoryStore::new();
        let member = Member::new("userA", Address::new("Seoul", "1", "1111"));
        let book = Item::book("JPA1 BOOK", 10_000, 100);
        let jpa2_book = Item::book("JPA2 BOOK", 20_000, 100);
        store.insert_member(&member).unwrap();
        store.insert_item(&book).unwrap();
        store.insert_item(&jpa2_book).unwrap();
        (store, member, book, jpa2_book)
    }

    #[tokio::test]
    async fn test_join_multiplies_rows_per_item() {
        let (store, member, book, jpa2_book) = seeded();
        seed_order(&store, &member, &[(&book, 1), (&jpa2_book, 2)]).await;
        seed_order(&store, &member, &[(&book, 3)]).await;

        let joined = store.find_orders_with_items(&OrderSearch::all()).await.unwrap();
        assert_eq!(joined.len(), 3);

        let roots = store.find_orders(&OrderSearch::all()).await.unwrap();
        assert_eq!(roots.len(), 2);
    }

    #[tokio::test]
    async fn test_to_one_rows_are_paged_in_id_order() {
        let (store, member, book, _) = seeded();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(seed_order(&store, &member, &[(&book, 1)]).await);
        }
        ids.sort();

        let page = Page::new(1, 2).unwrap();
        let rows = store
            .find_orders_with_member_delivery(&OrderSearch::all(), Some(page))
            .await
            .unwrap();

        let got: Vec<Uuid> = rows.iter().map(|row| row.order.id).collect();
        assert_eq!(got, ids[1..3].to_vec());
    }

    #[tokio::test]
    async fn test_apply_is_all_or_nothing() {
        let (store, member, book, _) = seeded();
        let order_id = seed_order(&store, &member, &[(&book, 1)]).await;

        let result = store
            .apply(&[
                Change::AdjustStock { item_id: book.id, delta: -5 },
                Change::UpdateOrderStatus {
                    order_id,
                    status: OrderStatus::Cancelled,
                    expected_version: 7,
                },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::VersionConflict { expected: 7, actual: 0, .. })));
        assert_eq!(store.stored_item(book.id).unwrap().unwrap().stock_quantity, 100);
        assert_eq!(store.stored_order(order_id).unwrap().unwrap().status, OrderStatus::Ordered);
    }

    #[tokio::test]
    async fn test_stock_underflow_rejected() {
        let (store, _, book, _) = seeded();

        let result = store.apply(&[Change::AdjustStock { item_id: book.id, delta: -101 }]).await;

        assert!(matches!(result, Err(StoreError::StockUnderflow { item_id }) if item_id == book.id));
        assert_eq!(store.stored_item(book.id).unwrap().unwrap().stock_quantity, 100);
    }

    #[tokio::test]
    async fn test_status_update_bumps_version() {
        let (store, member, book, _) = seeded();
        let order_id = seed_order(&store, &member, &[(&book, 1)]).await;

        store
            .apply(&[Change::UpdateOrderStatus {
                order_id,
                status: OrderStatus::Cancelled,
                expected_version: 0,
            }])
            .await
            .unwrap();

        let stored = store.stored_order(order_id).unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_search_filters_by_member_and_status() {
        let (store, member, book, _) = seeded();
        let other = Member::new("memberB", Address::new("Busan", "2", "2222"));
        store.insert_member(&other).unwrap();
        seed_order(&store, &member, &[(&book, 1)]).await;
        seed_order(&store, &other, &[(&book, 1)]).await;

        let by_name = store.find_orders(&OrderSearch::by_member_name("user")).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].member_id, member.id);

        let cancelled = store
            .find_orders(&OrderSearch::all().with_status(OrderStatus::Cancelled))
            .await
            .unwrap();
        assert!(cancelled.is_empty());
    }

    #[tokio::test]
    async fn test_search_by_member_id_separates_namesakes() {
        let (store, member, book, _) = seeded();
        let kim = Member::new("kim", Address::new("Seoul", "1", "1111"));
        let kimchi = Member::new("kimchi", Address::new("Seoul", "2", "2222"));
        let other_kim = Member::new("kim", Address::new("Busan", "3", "3333"));
        for m in [&kim, &kimchi, &other_kim] {
            store.insert_member(m).unwrap();
        }
        seed_order(&store, &member, &[(&book, 1)]).await;
        let kims_order = seed_order(&store, &kim, &[(&book, 1)]).await;
        seed_order(&store, &kimchi, &[(&book, 1)]).await;
        seed_order(&store, &other_kim, &[(&book, 1)]).await;

        let by_name = store.find_orders(&OrderSearch::by_member_name("kim")).await.unwrap();
        assert_eq!(by_name.len(), 3);

        let search = OrderSearch::by_member(kim.id);
        let roots = store.find_orders(&search).await.unwrap();
        assert_eq!(roots.iter().map(|o| o.id).collect::<Vec<_>>(), vec![kims_order]);
        assert_eq!(store.find_orders_with_items(&search).await.unwrap().len(), 1);
        assert_eq!(store.find_order_flat_rows(&search).await.unwrap().len(), 1);
        assert_eq!(store.find_order_query_rows(&search).await.unwrap().len(), 1);
        assert_eq!(
            store.find_orders_with_member_delivery(&search, None).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_lines_are_ordered_by_order_item_id() {
        let (store, member, book, jpa2_book) = seeded();
        let order_id = Uuid::now_v7();
        let first_line = Uuid::now_v7();
        let second_line = Uuid::now_v7();
        let delivery = Delivery::ready(member.address.clone());
        let line = |id: Uuid, item: &Item| OrderItemRow {
            id,
            order_id,
            item_id: item.id,
            order_price: item.price,
            count: 1,
        };
        store
            .apply(&[Change::InsertOrder {
                order: OrderRow {
                    id: order_id,
                    member_id: member.id,
                    delivery_id: delivery.id,
                    order_date: Utc::now(),
                    status: OrderStatus::Ordered,
                    version: 0,
                },
                delivery,
                order_items: vec![line(second_line, &jpa2_book), line(first_line, &book)],
            }])
            .await
            .unwrap();

        let expected = vec![first_line, second_line];
        let single: Vec<Uuid> = store.find_order_items(order_id).await.unwrap().iter().map(|oi| oi.id).collect();
        let batched: Vec<Uuid> = store
            .find_order_items_by_order_ids(&[order_id])
            .await
            .unwrap()
            .iter()
            .map(|oi| oi.id)
            .collect();
        let joined: Vec<Uuid> = store
            .find_orders_with_items(&OrderSearch::all())
            .await
            .unwrap()
            .iter()
            .map(|row| row.order_item.id)
            .collect();
        let flat: Vec<Uuid> = store
            .find_order_flat_rows(&OrderSearch::all())
            .await
            .unwrap()
            .iter()
            .map(|row| row.order_item_id)
            .collect();
        let names: Vec<String> = store
            .find_order_item_query_rows_by_order_ids(&[order_id])
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.item_name)
            .collect();

        assert_eq!(single, expected);
        assert_eq!(batched, expected);
        assert_eq!(joined, expected);
        assert_eq!(flat, expected);
        assert_eq!(names, vec![book.name.clone(), jpa2_book.name.clone()]);
    }
}
