use uuid::Uuid;

use crate::loading::config::LoaderConfig;
use crate::loading::errors::LoadError;
use crate::loading::grouping::group_by_parent;
use crate::loading::LoadSpan;
use crate::store::{OrderItemQueryRow, OrderSearch, QueryKind, Store, UnitOfWork};
use super::dto::{OrderDto, OrderItemDto};

/// Order rows first, then the lines of all those orders in one call per
/// batch of ids, merged by order id. Two queries for up to `batch_size`
/// orders, whatever their line counts.
#[derive(Debug, Clone, Copy)]
pub struct TwoStepProjection {
    config: LoaderConfig,
}

impl TwoStepProjection {
    pub fn new(config: LoaderConfig) -> Result<Self, LoadError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub async fn load<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<OrderDto>, LoadError> {
        let span = LoadSpan::start(uow, "projection_two_step");
        let result = self.load_rows(uow, search).await;
        span.finish(uow, &result);
        result
    }

    async fn load_rows<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<OrderDto>, LoadError> {
        let order_rows = uow
            .fetch(QueryKind::OrderQueryRows, |store| store.find_order_query_rows(search))
            .await?;
        if order_rows.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = order_rows.iter().map(|row| row.order_id).collect();
        let mut item_rows: Vec<OrderItemQueryRow> = Vec::new();
        for ids in order_ids.chunks(self.config.batch_size) {
            let rows = uow
                .fetch(QueryKind::OrderItemQueryRowsByOrderIds, |store| {
                    store.find_order_item_query_rows_by_order_ids(ids)
                })
                .await?;
            item_rows.extend(rows);
        }

        let mut grouped = group_by_parent(item_rows, &order_ids, |row| row.order_id);
        Ok(order_rows
            .into_iter()
            .map(|row| {
                let lines = grouped.remove(&row.order_id).unwrap_or_default();
                let mut dto = OrderDto::from_query_row(row);
                dto.order_items = lines.into_iter().map(OrderItemDto::from).collect();
                dto
            })
            .collect())
    }
}
