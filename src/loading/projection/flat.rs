use std::collections::HashMap;
use uuid::Uuid;

use crate::store::{OrderFlatRow, OrderSearch, QueryKind, Store, UnitOfWork};
use crate::loading::errors::LoadError;
use crate::loading::LoadSpan;
use super::dto::{OrderDto, OrderItemDto};

struct FlatGroup {
    dto: OrderDto,
    lines: HashMap<Uuid, usize>,
}

/// Group denormalized rows into one DTO per order.
///
/// The first row of an order fixes its order-level fields and its position;
/// later rows only contribute their line. Lines keep arrival order. A line
/// repeated verbatim is dropped, while conflicting rows are reported.
pub fn group_flat_rows(rows: Vec<OrderFlatRow>) -> Result<Vec<OrderDto>, LoadError> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut groups: Vec<FlatGroup> = Vec::new();

    for row in rows {
        let order_id = row.order_id;
        let position = match index.get(&order_id) {
            Some(&position) => {
                let dto = &groups[position].dto;
                if dto.name != row.member_name
                    || dto.order_date != row.order_date
                    || dto.order_status != row.status
                    || dto.address != row.address
                {
                    return Err(LoadError::InconsistentRoot { order_id });
                }
                position
            }
            None => {
                index.insert(order_id, groups.len());
                groups.push(FlatGroup {
                    dto: OrderDto {
                        order_id,
                        name: row.member_name.clone(),
                        order_date: row.order_date,
                        order_status: row.status,
                        address: row.address.clone(),
                        order_items: Vec::new(),
                    },
                    lines: HashMap::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[position];
        let line = OrderItemDto {
            item_name: row.item_name,
            order_price: row.order_price,
            count: row.count,
        };
        match group.lines.get(&row.order_item_id) {
            Some(&seen) if group.dto.order_items[seen] == line => {}
            Some(_) => {
                return Err(LoadError::DuplicateKey {
                    order_id,
                    order_item_id: row.order_item_id,
                })
            }
            None => {
                group.lines.insert(row.order_item_id, group.dto.order_items.len());
                group.dto.order_items.push(line);
            }
        }
    }

    Ok(groups.into_iter().map(|group| group.dto).collect())
}

/// One query, one row per (order × line), grouped in memory
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatProjection;

impl FlatProjection {
    pub async fn load<S: Store + ?Sized>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        search: &OrderSearch,
    ) -> Result<Vec<OrderDto>, LoadError> {
        let span = LoadSpan::start(uow, "projection_flat");
        let result = match uow
            .fetch(QueryKind::OrderFlatRows, |store| store.find_order_flat_rows(search))
            .await
        {
            Ok(rows) => group_flat_rows(rows),
            Err(e) => Err(e.into()),
        };
        span.finish(uow, &result);
        result
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
