use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::catalog::Item;
use crate::domain::delivery::Delivery;
use crate::domain::member::Member;
use crate::domain::order::{Order, OrderHeader, OrderItem};
use crate::store::{OrderItemRow, OrderJoinRow, OrderRow, OrderSearch, Page, QueryKind, Store, UnitOfWork};
use super::errors::LoadError;
use super::fetch_plan::FetchPlan;
use super::LoadSpan;

// ============================================================================
// Join-Fetch Loader
// ============================================================================
//
// One query joins every order with its member, delivery, order items and
// their catalog items. The join repeats each order once per order item, so
// rows are collapsed by order id in order of first appearance.
//
// A page cannot be pushed into this query: the limit would count joined
// rows, not orders. When a page is requested, the full result is collapsed
// first and sliced in memory.
//
// ============================================================================

/// One order collapsed out of join rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedOrder {
    pub order: OrderRow,
    pub member: Member,
    pub delivery: Delivery,
    pub lines: Vec<(OrderItemRow, Item)>,
}

/// Collapse join rows by order id.
///
/// Orders come out in order of first appearance, lines in arrival order.
/// A row repeated verbatim is dropped. Rows that share an order id but
/// disagree on order-level columns, or share an order item id with different
/// content, are reported instead of merged.
pub fn group_join_rows(rows: Vec<OrderJoinRow>) -> Result<Vec<JoinedOrder>, LoadError> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut orders: Vec<JoinedOrder> = Vec::new();

    for row in rows {
        let order_id = row.order.id;
        let position = match index.get(&order_id) {
            Some(&position) => {
                let seen = &orders[position];
                if seen.order != row.order || seen.member != row.member || seen.delivery != row.delivery {
                    return Err(LoadError::InconsistentRoot { order_id });
                }
                position
            }
            None => {
                index.insert(order_id, orders.len());
                orders.push(JoinedOrder {
                    order: row.order,
                    member: row.member,
                    delivery: row.delivery,
                    lines: Vec::new(),
                });
                orders.len() - 1
            }
        };

        let lines = &mut orders[position].lines;
        match lines.iter().find(|(order_item, _)| order_item.id == row.order_item.id) {
            Some((order_item, item)) if *order_item == row.order_item && *item == row.item => {}
            Some(_) => {
                return Err(LoadError::DuplicateKey {
                    order_id,
                    order_item_id: row.order_item.id,
                })
            }
            None => lines.push((row.order_item, row.item)),
        }
    }
    Ok(orders)
}

#[derive(Debug, Clone)]
pub struct FetchJoinLoader {
    page: Option<Page>,
}

impl FetchJoinLoader {
    /// Accepts only plans joining the whole order graph, since that is the
    /// one query this loader runs. Plans joining more than one collection
    /// or leaving a relation out are rejected before any query runs.
    pub fn new(plan: &FetchPlan) -> Result<Self, LoadError> {
        let page = plan.validate()?;
        let missing = plan.missing(FetchPlan::order_graph().relations());
        if !missing.is_empty() {
            return Err(LoadError::IncompletePlan(missing));
        }
        Ok(Self { page })
    }

    pub async fn load_with_items<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<Arc<Order>>, LoadError> {
        let span = LoadSpan::start(uow, "fetch_join");
        let result = self.load(uow, search).await;
        span.finish(uow, &result);
        result
    }

    async fn load<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<Arc<Order>>, LoadError> {
        let rows = uow
            .fetch(QueryKind::OrdersWithItems, |store| store.find_orders_with_items(search))
            .await?;
        let row_count = rows.len();

        let joined = group_join_rows(rows)?;
        tracing::debug!(rows = row_count, orders = joined.len(), "Collapsed join rows");

        let orders: Vec<Arc<Order>> = joined.into_iter().map(|order| assemble(uow, order)).collect();

        match self.page {
            Some(page) => {
                tracing::warn!(
                    offset = page.offset(),
                    limit = page.limit(),
                    orders = orders.len(),
                    "Page requested with a collection fetch, slicing in memory"
                );
                Ok(page.slice(orders))
            }
            None => Ok(orders),
        }
    }
}

/// The unit of work's instance for the order, built from `joined` only if
/// the order was not loaded before
fn assemble<S: Store + ?Sized>(uow: &mut UnitOfWork<'_, S>, joined: JoinedOrder) -> Arc<Order> {
    if let Some(order) = uow.cached_order(&joined.order.id) {
        return order;
    }

    let member = uow.intern_member(joined.member);
    let order_items = joined
        .lines
        .into_iter()
        .map(|(row, item)| {
            let item = uow.intern_item(item);
            OrderItem::restore(row.id, row.order_id, item, row.order_price, row.count)
        })
        .collect();

    let order = OrderHeader {
        id: joined.order.id,
        version: joined.order.version,
        member,
        delivery: joined.delivery,
        order_date: joined.order.order_date,
        status: joined.order.status,
    }
    .with_items(order_items);
    uow.intern_order(order)
}

// ============================================================================
// Unit Tests
// ============================================================================
