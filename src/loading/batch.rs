use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{Order, OrderHeader, OrderItem};
use crate::store::{OrderItemRow, OrderSearch, OrderToOneRow, Page, QueryKind, Store, StoreError, UnitOfWork};
use super::config::LoaderConfig;
use super::errors::LoadError;
use super::grouping::{distinct, group_by_parent};
use super::LoadSpan;

// ============================================================================
// Paginated Join + Batch Collection Loader
// ============================================================================
//
// Phase 1 joins orders with their to-one relations only, so one row is one
// order and the page can be applied by the store.
//
// Phase 2 resolves the collections for the page's order ids that the unit
// of work has not loaded yet, at most `batch_size` ids per query:
// - order items by order id
// - catalog items by item id, skipping items already in the unit of work
//
// Query count is 1 + ceil(N / batch_size) + ceil(M / batch_size) for N
// uncached orders referencing M distinct uncached items. Orders already in
// the unit of work are returned as they are.
//
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct BatchLoader {
    config: LoaderConfig,
}

impl BatchLoader {
    pub fn new(config: LoaderConfig) -> Result<Self, LoadError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// One page of orders, ordered by order id
    pub async fn load_page<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Arc<Order>>, LoadError> {
        let span = LoadSpan::start(uow, "batch");
        let result = match Page::new(offset, limit) {
            Ok(page) => self.load(uow, search, Some(page)).await,
            Err(e) => Err(e.into()),
        };
        span.finish(uow, &result);
        result
    }

    /// Every matching order, ordered by order id
    pub async fn load_all<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<Arc<Order>>, LoadError> {
        let span = LoadSpan::start(uow, "batch");
        let result = self.load(uow, search, None).await;
        span.finish(uow, &result);
        result
    }

    /// A single order with its items, `None` if no order has this id.
    /// Issues no query when the unit of work already holds the order.
    pub async fn load_one<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        order_id: Uuid,
    ) -> Result<Option<Arc<Order>>, LoadError> {
        if let Some(order) = uow.cached_order(&order_id) {
            return Ok(Some(order));
        }

        let root = uow
            .fetch_optional(QueryKind::OrderWithMemberDelivery, |store| {
                store.find_order_with_member_delivery(order_id)
            })
            .await?;

        match root {
            Some(root) => Ok(self.attach_items(uow, vec![root]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn load<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
        page: Option<Page>,
    ) -> Result<Vec<Arc<Order>>, LoadError> {
        let roots = uow
            .fetch(QueryKind::OrdersWithMemberDelivery, |store| {
                store.find_orders_with_member_delivery(search, page)
            })
            .await?;
        self.attach_items(uow, roots).await
    }

    async fn attach_items<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        roots: Vec<OrderToOneRow>,
    ) -> Result<Vec<Arc<Order>>, LoadError> {
        if roots.is_empty() {
            tracing::debug!("No orders in range, skipping batch phase");
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = roots
            .iter()
            .map(|root| root.order.id)
            .filter(|order_id| uow.cached_order(order_id).is_none())
            .collect();
        if order_ids.len() < roots.len() {
            tracing::debug!(cached = roots.len() - order_ids.len(), "Reusing orders held by the unit of work");
        }

        let mut item_rows: Vec<OrderItemRow> = Vec::new();
        for (batch, ids) in order_ids.chunks(self.config.batch_size).enumerate() {
            tracing::debug!(batch, size = ids.len(), "Loading order items batch");
            let rows = uow
                .fetch(QueryKind::OrderItemsByOrderIds, |store| store.find_order_items_by_order_ids(ids))
                .await?;
            item_rows.extend(rows);
        }

        let missing: Vec<Uuid> = distinct(item_rows.iter().map(|row| row.item_id))
            .into_iter()
            .filter(|item_id| !uow.catalog().contains(item_id))
            .collect();
        for (batch, ids) in missing.chunks(self.config.batch_size).enumerate() {
            tracing::debug!(batch, size = ids.len(), "Loading catalog items batch");
            let items = uow
                .fetch(QueryKind::ItemsByIds, |store| store.find_items_by_ids(ids))
                .await?;
            for item in items {
                uow.intern_item(item);
            }
        }

        let mut grouped = group_by_parent(item_rows, &order_ids, |row| row.order_id);

        let mut orders = Vec::with_capacity(roots.len());
        for root in roots {
            if let Some(order) = uow.cached_order(&root.order.id) {
                orders.push(order);
                continue;
            }

            let rows = grouped.remove(&root.order.id).unwrap_or_default();
            let mut order_items = Vec::with_capacity(rows.len());
            for row in rows {
                let item = uow
                    .catalog()
                    .get(&row.item_id)
                    .cloned()
                    .ok_or_else(|| StoreError::integrity(format!("order item {} has no item {}", row.id, row.item_id)))?;
                order_items.push(OrderItem::restore(row.id, row.order_id, item, row.order_price, row.count));
            }

            let header = OrderHeader {
                id: root.order.id,
                version: root.order.version,
                member: uow.intern_member(root.member),
                delivery: root.delivery,
                order_date: root.order.order_date,
                status: root.order.status,
            };
            orders.push(uow.intern_order(header.with_items(order_items)));
        }
        Ok(orders)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
