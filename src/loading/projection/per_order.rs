use crate::loading::errors::LoadError;
use crate::loading::LoadSpan;
use crate::store::{OrderSearch, QueryKind, Store, UnitOfWork};
use super::dto::{OrderDto, OrderItemDto};

/// Order rows, then one line query per order (1 + N)
#[derive(Debug, Clone, Copy, Default)]
pub struct PerOrderProjection;

impl PerOrderProjection {
    pub async fn load<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<OrderDto>, LoadError> {
        let span = LoadSpan::start(uow, "projection_per_order");
        let result = Self::load_rows(uow, search).await;
        span.finish(uow, &result);
        result
    }

    async fn load_rows<S: Store + ?Sized>(
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<OrderDto>, LoadError> {
        let order_rows = uow
            .fetch(QueryKind::OrderQueryRows, |store| store.find_order_query_rows(search))
            .await?;

        let mut orders = Vec::with_capacity(order_rows.len());
        for row in order_rows {
            let order_id = row.order_id;
            let lines = uow
                .fetch(QueryKind::OrderItemQueryRows, |store| store.find_order_item_query_rows(order_id))
                .await?;

            let mut dto = OrderDto::from_query_row(row);
            dto.order_items = lines.into_iter().map(OrderItemDto::from).collect();
            orders.push(dto);
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::projection::TwoStepProjection;
    use crate::loading::LoaderConfig;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_one_line_query_per_order() {
        let fixture = Fixture::new();
        fixture.place_many(&[2, 1, 3]).await;

        let mut uow = UnitOfWork::begin(&fixture.store);
        let orders = PerOrderProjection.load(&mut uow, &OrderSearch::all()).await.unwrap();

        assert_eq!(orders.len(), 3);
        assert_eq!(uow.stats().count(QueryKind::OrderQueryRows), 1);
        assert_eq!(uow.stats().count(QueryKind::OrderItemQueryRows), 3);

        let two_step = TwoStepProjection::new(LoaderConfig::default())
            .unwrap()
            .load(&mut uow, &OrderSearch::all())
            .await
            .unwrap();
        assert_eq!(orders, two_step);
    }
}
