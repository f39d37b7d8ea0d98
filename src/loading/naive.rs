use std::sync::Arc;

use crate::domain::order::{Order, OrderHeader, OrderItem};
use crate::store::{OrderSearch, QueryKind, Store, StoreError, UnitOfWork};
use super::errors::LoadError;
use super::LoadSpan;

/// Loads roots, then resolves every relation of every root one query at a
/// time. Orders, members and items already held by the unit of work are not
/// queried again. Kept as the reference the other strategies are checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveLoader;

impl NaiveLoader {
    pub async fn load_all<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<Arc<Order>>, LoadError> {
        let span = LoadSpan::start(uow, "naive");
        let result = Self::load(uow, search).await;
        span.finish(uow, &result);
        result
    }

    async fn load<S: Store + ?Sized>(
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<Arc<Order>>, LoadError> {
        let roots = uow
            .fetch(QueryKind::Orders, |store| store.find_orders(search))
            .await?;

        let mut orders = Vec::with_capacity(roots.len());
        for root in roots {
            if let Some(order) = uow.cached_order(&root.id) {
                orders.push(order);
                continue;
            }

            let member = uow
                .load_member(root.member_id)
                .await?
                .ok_or_else(|| StoreError::integrity(format!("order {} has no member {}", root.id, root.member_id)))?;

            let delivery_id = root.delivery_id;
            let delivery = uow
                .fetch_optional(QueryKind::Delivery, |store| store.find_delivery(delivery_id))
                .await?
                .ok_or_else(|| StoreError::integrity(format!("order {} has no delivery {}", root.id, delivery_id)))?;

            let order_id = root.id;
            let item_rows = uow
                .fetch(QueryKind::OrderItems, |store| store.find_order_items(order_id))
                .await?;

            let mut order_items = Vec::with_capacity(item_rows.len());
            for row in item_rows {
                let item = uow
                    .load_item(row.item_id)
                    .await?
                    .ok_or_else(|| StoreError::integrity(format!("order item {} has no item {}", row.id, row.item_id)))?;
                order_items.push(OrderItem::restore(row.id, row.order_id, item, row.order_price, row.count));
            }

            let header = OrderHeader {
                id: root.id,
                version: root.version,
                member,
                delivery,
                order_date: root.order_date,
                status: root.status,
            };
            orders.push(uow.intern_order(header.with_items(order_items)));
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_naive_load_resolves_every_relation() {
        let fixture = Fixture::new();
        fixture.place(0, &[(0, 1), (1, 2)]).await;
        fixture.place(1, &[(2, 3), (3, 4)]).await;

        let mut uow = UnitOfWork::begin(&fixture.store);
        let orders = NaiveLoader.load_all(&mut uow, &OrderSearch::all()).await.unwrap();

        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|order| order.order_items().len() == 2));
        assert_eq!(orders[0].member().name, "userA");
        assert_eq!(orders[1].member().name, "userB");
        assert_eq!(orders[0].total_price(), 10_000 + 2 * 20_000);
    }

    #[tokio::test]
    async fn test_naive_query_count_grows_with_roots() {
        let fixture = Fixture::new();
        fixture.place(0, &[(0, 1), (1, 1)]).await;
        fixture.place(0, &[(0, 1), (1, 1)]).await;
        fixture.place(0, &[(0, 1)]).await;

        let mut uow = UnitOfWork::begin(&fixture.store);
        NaiveLoader.load_all(&mut uow, &OrderSearch::all()).await.unwrap();

        let stats = uow.stats();
        assert_eq!(stats.count(QueryKind::Orders), 1);
        // one member and two items, each queried once
        assert_eq!(stats.count(QueryKind::Member), 1);
        assert_eq!(stats.count(QueryKind::Item), 2);
        assert_eq!(stats.count(QueryKind::Delivery), 3);
        assert_eq!(stats.count(QueryKind::OrderItems), 3);
    }

    #[tokio::test]
    async fn test_shared_item_is_one_instance() {
        let fixture = Fixture::new();
        fixture.place(0, &[(0, 1)]).await;
        fixture.place(1, &[(0, 2)]).await;

        let mut uow = UnitOfWork::begin(&fixture.store);
        let orders = NaiveLoader.load_all(&mut uow, &OrderSearch::all()).await.unwrap();

        assert!(Arc::ptr_eq(
            orders[0].order_items()[0].item(),
            orders[1].order_items()[0].item()
        ));
    }

    #[tokio::test]
    async fn test_search_filters_roots() {
        let fixture = Fixture::new();
        fixture.place(0, &[(0, 1)]).await;
        fixture.place(1, &[(1, 1)]).await;

        let mut uow = UnitOfWork::begin(&fixture.store);
        let orders = NaiveLoader
            .load_all(&mut uow, &OrderSearch::by_member_name("B"))
            .await
            .unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].member().name, "userB");
    }

    #[tokio::test]
    async fn test_second_load_reuses_session_orders() {
        let fixture = Fixture::new();
        fixture.place_many(&[2, 1]).await;

        let mut uow = UnitOfWork::begin(&fixture.store);
        let first = NaiveLoader.load_all(&mut uow, &OrderSearch::all()).await.unwrap();
        let queries = uow.stats().total();
        let second = NaiveLoader.load_all(&mut uow, &OrderSearch::all()).await.unwrap();

        // only the root query runs again
        assert_eq!(uow.stats().total(), queries + 1);
        assert_eq!(uow.stats().count(QueryKind::Orders), 2);
        assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
    }
}
