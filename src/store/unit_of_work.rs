use futures_util::future::BoxFuture;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::catalog::{Catalog, Item};
use crate::domain::member::Member;
use crate::domain::order::Order;
use crate::metrics::Metrics;
use super::changes::Change;
use super::errors::StoreError;
use super::{QueryKind, Store};

// ============================================================================
// Unit of Work
// ============================================================================
//
// One request's session with the store. Within a unit of work:
// - every store call is counted per query shape
// - an order, member or item id resolves to one shared instance, and an
//   order already loaded is never read from the store again
// - writes are buffered and applied as one change set on commit
//
// A unit of work dropped without commit discards its pending writes.
//
// ============================================================================

/// Store calls issued by one unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    counts: BTreeMap<QueryKind, usize>,
    rows: usize,
}

impl QueryStats {
    pub fn count(&self, kind: QueryKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Rows returned by all counted queries
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn record(&mut self, kind: QueryKind) {
        *self.counts.entry(kind).or_default() += 1;
    }
}

pub struct UnitOfWork<'s, S: Store + ?Sized> {
    id: Uuid,
    store: &'s S,
    metrics: Option<Arc<Metrics>>,
    orders: HashMap<Uuid, Arc<Order>>,
    members: HashMap<Uuid, Arc<Member>>,
    catalog: Catalog,
    changes: Vec<Change>,
    stats: QueryStats,
    finished: bool,
}

impl<'s, S: Store + ?Sized> UnitOfWork<'s, S> {
    pub fn begin(store: &'s S) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(unit_of_work = %id, "Unit of work started");

        Self {
            id,
            store,
            metrics: None,
            orders: HashMap::new(),
            members: HashMap::new(),
            catalog: Catalog::new(),
            changes: Vec::new(),
            stats: QueryStats::default(),
            finished: false,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    pub fn metrics(&self) -> Option<&Arc<Metrics>> {
        self.metrics.as_ref()
    }

    fn record_query(&mut self, kind: QueryKind) {
        self.stats.record(kind);
        if let Some(metrics) = &self.metrics {
            metrics.record_store_query(kind.as_str());
        }
    }

    /// Issue a store query returning a list of rows
    pub async fn fetch<R, F, Fut>(&mut self, kind: QueryKind, query: F) -> Result<Vec<R>, StoreError>
    where
        F: FnOnce(&'s S) -> Fut,
        Fut: Future<Output = Result<Vec<R>, StoreError>>,
    {
        self.record_query(kind);
        let rows = query(self.store).await?;
        self.stats.rows += rows.len();

        tracing::debug!(
            unit_of_work = %self.id,
            query = kind.as_str(),
            rows = rows.len(),
            "Store query"
        );
        Ok(rows)
    }

    /// Issue a store query returning at most one row
    pub async fn fetch_optional<R, F, Fut>(&mut self, kind: QueryKind, query: F) -> Result<Option<R>, StoreError>
    where
        F: FnOnce(&'s S) -> Fut,
        Fut: Future<Output = Result<Option<R>, StoreError>>,
    {
        self.record_query(kind);
        let row = query(self.store).await?;
        self.stats.rows += usize::from(row.is_some());

        tracing::debug!(
            unit_of_work = %self.id,
            query = kind.as_str(),
            found = row.is_some(),
            "Store query"
        );
        Ok(row)
    }

    // ========================================================================
    // Identity maps
    // ========================================================================

    pub fn cached_order(&self, order_id: &Uuid) -> Option<Arc<Order>> {
        self.orders.get(order_id).cloned()
    }

    /// Return the session instance for `order.id()`, registering `order` if new
    pub fn intern_order(&mut self, order: Order) -> Arc<Order> {
        self.orders
            .entry(order.id())
            .or_insert_with(|| Arc::new(order))
            .clone()
    }

    /// Make `order` the session instance for its id, after a change made in
    /// this unit of work
    pub fn replace_order(&mut self, order: Order) -> Arc<Order> {
        let order = Arc::new(order);
        self.orders.insert(order.id(), order.clone());
        order
    }

    /// Return the session instance for `member.id`, registering `member` if new
    pub fn intern_member(&mut self, member: Member) -> Arc<Member> {
        self.members
            .entry(member.id)
            .or_insert_with(|| Arc::new(member))
            .clone()
    }

    pub fn cached_member(&self, member_id: &Uuid) -> Option<Arc<Member>> {
        self.members.get(member_id).cloned()
    }

    /// Member by id, queried only on the first request within this unit of work
    pub async fn load_member(&mut self, member_id: Uuid) -> Result<Option<Arc<Member>>, StoreError> {
        if let Some(member) = self.cached_member(&member_id) {
            return Ok(Some(member));
        }
        let member = self
            .fetch_optional(QueryKind::Member, |store| store.find_member(member_id))
            .await?;
        Ok(member.map(|member| self.intern_member(member)))
    }

    pub fn intern_item(&mut self, item: Item) -> Arc<Item> {
        self.catalog.intern(item)
    }

    /// Item by id, queried only on the first request within this unit of work
    pub async fn load_item(&mut self, item_id: Uuid) -> Result<Option<Arc<Item>>, StoreError> {
        if let Some(item) = self.catalog.get(&item_id) {
            return Ok(Some(item.clone()));
        }
        let item = self
            .fetch_optional(QueryKind::Item, |store| store.find_item(item_id))
            .await?;
        Ok(item.map(|item| self.intern_item(item)))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub fn register(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn pending_changes(&self) -> &[Change] {
        &self.changes
    }

    /// Apply all registered changes as one atomic change set
    pub async fn commit(mut self) -> Result<(), StoreError> {
        self.finished = true;
        let changes = std::mem::take(&mut self.changes);

        if changes.is_empty() {
            tracing::debug!(unit_of_work = %self.id, queries = self.stats.total(), "Unit of work closed");
            self.record_outcome("closed");
            return Ok(());
        }

        self.record_query(QueryKind::Apply);
        match self.store.apply(&changes).await {
            Ok(()) => {
                tracing::info!(
                    unit_of_work = %self.id,
                    changes = changes.len(),
                    queries = self.stats.total(),
                    "Unit of work committed"
                );
                self.record_outcome("commit");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(unit_of_work = %self.id, error = %e, "Commit rejected, change set discarded");
                self.record_outcome("rollback");
                Err(e)
            }
        }
    }

    /// Discard all registered changes
    pub fn rollback(mut self) {
        self.finished = true;
        let discarded = std::mem::take(&mut self.changes).len();
        tracing::debug!(unit_of_work = %self.id, discarded, "Unit of work rolled back");
        self.record_outcome("rollback");
    }

    fn record_outcome(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_unit_of_work(outcome);
        }
    }
}

impl<'s, S: Store + ?Sized> Drop for UnitOfWork<'s, S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if !self.changes.is_empty() {
            tracing::warn!(
                unit_of_work = %self.id,
                discarded = self.changes.len(),
                "Unit of work dropped without commit, pending changes discarded"
            );
        }
        self.record_outcome("rollback");
    }
}

/// Run `work` inside a fresh unit of work.
///
/// Commits when `work` succeeds and rolls back when it fails. A failed
/// commit is reported through `E`.
pub async fn run_in_unit_of_work<'s, S, T, E, F>(
    store: &'s S,
    metrics: Option<Arc<Metrics>>,
    work: F,
) -> Result<T, E>
where
    S: Store + ?Sized,
    E: From<StoreError>,
    F: for<'u> FnOnce(&'u mut UnitOfWork<'s, S>) -> BoxFuture<'u, Result<T, E>>,
{
    let mut uow = UnitOfWork::begin(store).with_metrics(metrics);
    match work(&mut uow).await {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            uow.rollback();
            Err(e)
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
