use futures_util::FutureExt;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::delivery::Delivery;
use crate::domain::order::{Order, OrderLine};
use crate::loading::projection::{
    FlatProjection, OrderDto, PerOrderProjection, SimpleOrderDto, SimpleOrderProjection, TwoStepProjection,
};
use crate::loading::{distinct, BatchLoader, FetchJoinLoader, FetchPlan, LoaderConfig, NaiveLoader};
use crate::metrics::Metrics;
use crate::store::{run_in_unit_of_work, Change, OrderSearch, Page, Store, UnitOfWork};
use super::errors::ServiceError;

pub struct OrderService {
    store: Arc<dyn Store>,
    config: LoaderConfig,
    metrics: Option<Arc<Metrics>>,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, config: LoaderConfig) -> Self {
        Self {
            store,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn begin(&self) -> UnitOfWork<'_, dyn Store> {
        UnitOfWork::begin(self.store.as_ref()).with_metrics(self.metrics.clone())
    }

    fn record_transition(&self, transition: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_transition(transition);
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Order `count` of one item for a member, delivered to the member's address
    pub async fn place_order(&self, member_id: Uuid, item_id: Uuid, count: i32) -> Result<Uuid, ServiceError> {
        self.place_order_lines(member_id, vec![OrderLine::new(item_id, count)])
            .await
    }

    pub async fn place_order_lines(&self, member_id: Uuid, lines: Vec<OrderLine>) -> Result<Uuid, ServiceError> {
        let order_id = run_in_unit_of_work(self.store.as_ref(), self.metrics.clone(), move |uow| {
            async move {
                let member = uow
                    .load_member(member_id)
                    .await?
                    .ok_or(ServiceError::MemberNotFound(member_id))?;
                for item_id in distinct(lines.iter().map(|line| line.item_id)) {
                    uow.load_item(item_id)
                        .await?
                        .ok_or(ServiceError::ItemNotFound(item_id))?;
                }

                let delivery = Delivery::ready(member.address.clone());
                let order = match Order::place(member, delivery, &lines, uow.catalog_mut()) {
                    Ok(order) => order,
                    Err(e) => {
                        tracing::warn!(member_id = %member_id, error = %e, "Order rejected");
                        return Err(e.into());
                    }
                };

                uow.register(Change::insert_order(&order));
                for line in &lines {
                    uow.register(Change::AdjustStock {
                        item_id: line.item_id,
                        delta: -line.count,
                    });
                }

                tracing::info!(
                    order_id = %order.id(),
                    member_id = %member_id,
                    lines = lines.len(),
                    total_price = order.total_price(),
                    "Order placed"
                );
                Ok::<_, ServiceError>(order.id())
            }
            .boxed()
        })
        .await?;

        self.record_transition("place");
        Ok(order_id)
    }

    /// Cancel an order and put its lines back into stock
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let loader = BatchLoader::new(self.config)?;

        run_in_unit_of_work(self.store.as_ref(), self.metrics.clone(), move |uow| {
            async move {
                let loaded = loader
                    .load_one(uow, order_id)
                    .await?
                    .ok_or(ServiceError::OrderNotFound(order_id))?;

                let mut order = Order::clone(&loaded);
                if let Err(e) = order.cancel(uow.catalog_mut()) {
                    tracing::warn!(order_id = %order_id, error = %e, "Cancel rejected");
                    return Err(e.into());
                }

                uow.register(Change::update_status(&order));
                for order_item in order.order_items() {
                    uow.register(Change::AdjustStock {
                        item_id: order_item.item_id(),
                        delta: order_item.count(),
                    });
                }

                tracing::info!(order_id = %order_id, version = order.version(), "Order cancelled");
                uow.replace_order(order);
                Ok::<_, ServiceError>(())
            }
            .boxed()
        })
        .await?;

        self.record_transition("cancel");
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn find_order(&self, order_id: Uuid) -> Result<OrderDto, ServiceError> {
        let loader = BatchLoader::new(self.config)?;
        let mut uow = self.begin();
        let order = loader
            .load_one(&mut uow, order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;
        uow.commit().await?;
        Ok(OrderDto::from(order.as_ref()))
    }

    /// Aggregates resolved one relation at a time
    pub async fn orders_naive(&self, search: &OrderSearch) -> Result<Vec<Arc<Order>>, ServiceError> {
        let mut uow = self.begin();
        let orders = NaiveLoader.load_all(&mut uow, search).await?;
        uow.commit().await?;
        Ok(orders)
    }

    pub async fn order_dtos_naive(&self, search: &OrderSearch) -> Result<Vec<OrderDto>, ServiceError> {
        let orders = self.orders_naive(search).await?;
        Ok(orders.iter().map(|order| OrderDto::from(order.as_ref())).collect())
    }

    pub async fn order_dtos_fetch_join(&self, search: &OrderSearch) -> Result<Vec<OrderDto>, ServiceError> {
        let loader = FetchJoinLoader::new(&FetchPlan::order_graph())?;
        let mut uow = self.begin();
        let orders = loader.load_with_items(&mut uow, search).await?;
        uow.commit().await?;
        Ok(orders.iter().map(|order| OrderDto::from(order.as_ref())).collect())
    }

    pub async fn order_dtos_page(
        &self,
        search: &OrderSearch,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<OrderDto>, ServiceError> {
        let loader = BatchLoader::new(self.config)?;
        let mut uow = self.begin();
        let orders = loader.load_page(&mut uow, search, offset, limit).await?;
        uow.commit().await?;
        Ok(orders.iter().map(|order| OrderDto::from(order.as_ref())).collect())
    }

    pub async fn order_dtos_per_order(&self, search: &OrderSearch) -> Result<Vec<OrderDto>, ServiceError> {
        let mut uow = self.begin();
        let orders = PerOrderProjection.load(&mut uow, search).await?;
        uow.commit().await?;
        Ok(orders)
    }

    pub async fn order_dtos_two_step(&self, search: &OrderSearch) -> Result<Vec<OrderDto>, ServiceError> {
        let projection = TwoStepProjection::new(self.config)?;
        let mut uow = self.begin();
        let orders = projection.load(&mut uow, search).await?;
        uow.commit().await?;
        Ok(orders)
    }

    pub async fn order_dtos_flat(&self, search: &OrderSearch) -> Result<Vec<OrderDto>, ServiceError> {
        let mut uow = self.begin();
        let orders = FlatProjection.load(&mut uow, search).await?;
        uow.commit().await?;
        Ok(orders)
    }

    pub async fn simple_orders(
        &self,
        search: &OrderSearch,
        page: Option<Page>,
    ) -> Result<Vec<SimpleOrderDto>, ServiceError> {
        let mut uow = self.begin();
        let orders = SimpleOrderProjection.load(&mut uow, search, page).await?;
        uow.commit().await?;
        Ok(orders)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
