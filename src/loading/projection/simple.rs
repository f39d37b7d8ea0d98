use crate::loading::errors::LoadError;
use crate::loading::LoadSpan;
use crate::store::{OrderSearch, Page, QueryKind, Store, UnitOfWork};
use super::dto::SimpleOrderDto;

/// Orders with member and delivery columns only, one join query
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleOrderProjection;

impl SimpleOrderProjection {
    pub async fn load<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
        page: Option<Page>,
    ) -> Result<Vec<SimpleOrderDto>, LoadError> {
        let span = LoadSpan::start(uow, "simple");
        let result = uow
            .fetch(QueryKind::OrdersWithMemberDelivery, |store| {
                store.find_orders_with_member_delivery(search, page)
            })
            .await
            .map(|rows| rows.into_iter().map(SimpleOrderDto::from).collect())
            .map_err(LoadError::from);
        span.finish(uow, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_simple_orders_in_one_query() {
        let fixture = Fixture::new();
        let ids = fixture.place_many(&[3, 2, 1]).await;

        let mut uow = UnitOfWork::begin(&fixture.store);
        let orders = SimpleOrderProjection
            .load(&mut uow, &OrderSearch::all(), None)
            .await
            .unwrap();

        assert_eq!(uow.stats().total(), 1);
        assert_eq!(orders.iter().map(|o| o.order_id).collect::<Vec<_>>(), ids);
    }

    #[tokio::test]
    async fn test_simple_orders_paged() {
        let fixture = Fixture::new();
        let ids = fixture.place_many(&[1, 1, 1]).await;

        let mut uow = UnitOfWork::begin(&fixture.store);
        let orders = SimpleOrderProjection
            .load(&mut uow, &OrderSearch::all(), Some(Page::new(1, 5).unwrap()))
            .await
            .unwrap();

        assert_eq!(orders.iter().map(|o| o.order_id).collect::<Vec<_>>(), ids[1..].to_vec());
    }
}
