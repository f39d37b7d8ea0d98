use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use uuid::Uuid;

use crate::domain::catalog::{Item, ItemKind};
use crate::domain::delivery::{Delivery, DeliveryStatus};
use crate::domain::member::{Address, Member};
use crate::domain::order::OrderStatus;
use super::changes::Change;
use super::errors::StoreError;
use super::rows::*;
use super::search::{OrderSearch, Page};
use super::Store;

// ============================================================================
// Postgres Store
// ============================================================================
//
// Every query shape of the `Store` trait maps to one SQL statement. Id-set
// lookups bind a UUID array and filter with `= ANY($1)`. A change set runs
// in one transaction; dropping the transaction on error rolls it back.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS member (
        member_id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        city TEXT NOT NULL,
        street TEXT NOT NULL,
        zipcode TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS item (
        item_id UUID PRIMARY KEY,
        dtype TEXT NOT NULL,
        name TEXT NOT NULL,
        price BIGINT NOT NULL,
        stock_quantity INT NOT NULL CHECK (stock_quantity >= 0),
        attributes TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS delivery (
        delivery_id UUID PRIMARY KEY,
        city TEXT NOT NULL,
        street TEXT NOT NULL,
        zipcode TEXT NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        order_id UUID PRIMARY KEY,
        member_id UUID NOT NULL REFERENCES member (member_id),
        delivery_id UUID NOT NULL UNIQUE REFERENCES delivery (delivery_id) ON DELETE CASCADE,
        order_date TIMESTAMPTZ NOT NULL,
        status TEXT NOT NULL,
        version BIGINT NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS order_item (
        order_item_id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES orders (order_id) ON DELETE CASCADE,
        item_id UUID NOT NULL REFERENCES item (item_id),
        order_price BIGINT NOT NULL,
        count INT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS order_item_order_id_idx ON order_item (order_id)",
    "CREATE INDEX IF NOT EXISTS orders_member_id_idx ON orders (member_id)",
];

const ORDER_COLUMNS: &str = "o.order_id, o.member_id, o.delivery_id, o.order_date, o.status, o.version";
const MEMBER_COLUMNS: &str =
    "m.member_id AS m_id, m.name AS m_name, m.city AS m_city, m.street AS m_street, m.zipcode AS m_zipcode";
const DELIVERY_COLUMNS: &str =
    "d.delivery_id AS d_id, d.city AS d_city, d.street AS d_street, d.zipcode AS d_zipcode, d.status AS d_status";
const ORDER_ITEM_COLUMNS: &str =
    "oi.order_item_id, oi.order_id AS oi_order_id, oi.item_id AS oi_item_id, oi.order_price, oi.count";
const ITEM_COLUMNS: &str =
    "i.item_id AS i_id, i.name AS i_name, i.price AS i_price, i.stock_quantity AS i_stock, i.attributes AS i_attributes";

/// Filter on `o.member_id`, `m.name` and `o.status`, bound as `$1`..`$3` by `bind_search`
const SEARCH_FILTER: &str = "($1::UUID IS NULL OR o.member_id = $1)
     AND ($2::TEXT IS NULL OR m.name LIKE $2 ESCAPE '\\')
     AND ($3::TEXT IS NULL OR o.status = $3)";

fn bind_search<'q>(
    query: Query<'q, Postgres, PgArguments>,
    search: &OrderSearch,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(search.member_id)
        .bind(search.member_name_pattern())
        .bind(search.order_status.map(|s| s.as_str()))
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to Postgres");
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!(statements = SCHEMA.len(), "Schema ready");
        Ok(())
    }

    pub async fn insert_member(&self, member: &Member) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO member (member_id, name, city, street, zipcode) VALUES ($1, $2, $3, $4, $5)")
            .bind(member.id)
            .bind(&member.name)
            .bind(&member.address.city)
            .bind(&member.address.street)
            .bind(&member.address.zipcode)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_item(&self, item: &Item) -> Result<(), StoreError> {
        let attributes = serde_json::to_string(&item.kind)
            .map_err(|e| StoreError::integrity(format!("cannot encode item attributes: {}", e)))?;

        sqlx::query(
            "INSERT INTO item (item_id, dtype, name, price, stock_quantity, attributes)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.id)
        .bind(item.kind.dtype())
        .bind(&item.name)
        .bind(item.price)
        .bind(item.stock_quantity)
        .bind(attributes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn apply_change(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        change: &Change,
    ) -> Result<(), StoreError> {
        match change {
            Change::InsertOrder { order, delivery, order_items } => {
                sqlx::query(
                    "INSERT INTO delivery (delivery_id, city, street, zipcode, status) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(delivery.id)
                .bind(&delivery.address.city)
                .bind(&delivery.address.street)
                .bind(&delivery.address.zipcode)
                .bind(delivery.status.as_str())
                .execute(&mut **tx)
                .await?;

                sqlx::query(
                    "INSERT INTO orders (order_id, member_id, delivery_id, order_date, status, version)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(order.id)
                .bind(order.member_id)
                .bind(order.delivery_id)
                .bind(order.order_date)
                .bind(order.status.as_str())
                .bind(order.version)
                .execute(&mut **tx)
                .await?;

                for order_item in order_items {
                    sqlx::query(
                        "INSERT INTO order_item (order_item_id, order_id, item_id, order_price, count)
                         VALUES ($1, $2, $3, $4, $5)",
                    )
                    .bind(order_item.id)
                    .bind(order_item.order_id)
                    .bind(order_item.item_id)
                    .bind(order_item.order_price)
                    .bind(order_item.count)
                    .execute(&mut **tx)
                    .await?;
                }
            }
            Change::UpdateOrderStatus { order_id, status, expected_version } => {
                let updated = sqlx::query(
                    "UPDATE orders SET status = $1, version = version + 1
                     WHERE order_id = $2 AND version = $3",
                )
                .bind(status.as_str())
                .bind(order_id)
                .bind(expected_version)
                .execute(&mut **tx)
                .await?;

                if updated.rows_affected() == 0 {
                    let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE order_id = $1")
                        .bind(order_id)
                        .fetch_optional(&mut **tx)
                        .await?;

                    return Err(match actual {
                        Some(actual) => StoreError::VersionConflict {
                            order_id: *order_id,
                            expected: *expected_version,
                            actual,
                        },
                        None => StoreError::integrity(format!("unknown order {}", order_id)),
                    });
                }
            }
            Change::AdjustStock { item_id, delta } => {
                let updated = sqlx::query(
                    "UPDATE item SET stock_quantity = stock_quantity + $1
                     WHERE item_id = $2 AND stock_quantity + $1 >= 0",
                )
                .bind(delta)
                .bind(item_id)
                .execute(&mut **tx)
                .await?;

                if updated.rows_affected() == 0 {
                    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM item WHERE item_id = $1)")
                        .bind(item_id)
                        .fetch_one(&mut **tx)
                        .await?;

                    return Err(if exists {
                        StoreError::StockUnderflow { item_id: *item_id }
                    } else {
                        StoreError::integrity(format!("unknown item {}", item_id))
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Row decoding
// ============================================================================

fn decode_status(value: &str) -> Result<OrderStatus, StoreError> {
    OrderStatus::parse(value).ok_or_else(|| StoreError::integrity(format!("unknown order status {}", value)))
}

fn decode_order(row: &PgRow) -> Result<OrderRow, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(OrderRow {
        id: row.try_get("order_id")?,
        member_id: row.try_get("member_id")?,
        delivery_id: row.try_get("delivery_id")?,
        order_date: row.try_get::<DateTime<Utc>, _>("order_date")?,
        status: decode_status(&status)?,
        version: row.try_get("version")?,
    })
}

fn decode_member(row: &PgRow) -> Result<Member, StoreError> {
    Ok(Member {
        id: row.try_get("m_id")?,
        name: row.try_get("m_name")?,
        address: Address {
            city: row.try_get("m_city")?,
            street: row.try_get("m_street")?,
            zipcode: row.try_get("m_zipcode")?,
        },
    })
}

fn decode_delivery(row: &PgRow) -> Result<Delivery, StoreError> {
    let status: String = row.try_get("d_status")?;
    Ok(Delivery {
        id: row.try_get("d_id")?,
        address: Address {
            city: row.try_get("d_city")?,
            street: row.try_get("d_street")?,
            zipcode: row.try_get("d_zipcode")?,
        },
        status: DeliveryStatus::parse(&status)
            .ok_or_else(|| StoreError::integrity(format!("unknown delivery status {}", status)))?,
    })
}

fn decode_order_item(row: &PgRow) -> Result<OrderItemRow, StoreError> {
    Ok(OrderItemRow {
        id: row.try_get("order_item_id")?,
        order_id: row.try_get("oi_order_id")?,
        item_id: row.try_get("oi_item_id")?,
        order_price: row.try_get("order_price")?,
        count: row.try_get("count")?,
    })
}

fn decode_item(row: &PgRow) -> Result<Item, StoreError> {
    let attributes: String = row.try_get("i_attributes")?;
    let kind: ItemKind = serde_json::from_str(&attributes)
        .map_err(|e| StoreError::integrity(format!("cannot decode item attributes: {}", e)))?;
    Ok(Item {
        id: row.try_get("i_id")?,
        name: row.try_get("i_name")?,
        price: row.try_get("i_price")?,
        stock_quantity: row.try_get("i_stock")?,
        kind,
    })
}

fn decode_to_one(row: &PgRow) -> Result<OrderToOneRow, StoreError> {
    Ok(OrderToOneRow {
        order: decode_order(row)?,
        member: decode_member(row)?,
        delivery: decode_delivery(row)?,
    })
}

fn decode_order_query(row: &PgRow) -> Result<OrderQueryRow, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(OrderQueryRow {
        order_id: row.try_get("order_id")?,
        member_name: row.try_get("m_name")?,
        order_date: row.try_get("order_date")?,
        status: decode_status(&status)?,
        address: Address {
            city: row.try_get("d_city")?,
            street: row.try_get("d_street")?,
            zipcode: row.try_get("d_zipcode")?,
        },
    })
}

fn decode_item_query(row: &PgRow) -> Result<OrderItemQueryRow, StoreError> {
    Ok(OrderItemQueryRow {
        order_id: row.try_get("oi_order_id")?,
        item_name: row.try_get("i_name")?,
        order_price: row.try_get("order_price")?,
        count: row.try_get("count")?,
    })
}

fn decode_all<T>(rows: &[PgRow], decode: fn(&PgRow) -> Result<T, StoreError>) -> Result<Vec<T>, StoreError> {
    rows.iter().map(decode).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn find_orders(&self, search: &OrderSearch) -> Result<Vec<OrderRow>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             JOIN member m ON m.member_id = o.member_id
             WHERE {SEARCH_FILTER}
             ORDER BY o.order_id"
        );
        let rows = bind_search(sqlx::query(&sql), search).fetch_all(&self.pool).await?;
        decode_all(&rows, decode_order)
    }

    async fn find_member(&self, member_id: Uuid) -> Result<Option<Member>, StoreError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM member m WHERE m.member_id = $1");
        let row = sqlx::query(&sql).bind(member_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_member).transpose()
    }

    async fn find_delivery(&self, delivery_id: Uuid) -> Result<Option<Delivery>, StoreError> {
        let sql = format!("SELECT {DELIVERY_COLUMNS} FROM delivery d WHERE d.delivery_id = $1");
        let row = sqlx::query(&sql).bind(delivery_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_delivery).transpose()
    }

    async fn find_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemRow>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_item oi
             WHERE oi.order_id = $1 ORDER BY oi.order_item_id"
        );
        let rows = sqlx::query(&sql).bind(order_id).fetch_all(&self.pool).await?;
        decode_all(&rows, decode_order_item)
    }

    async fn find_item(&self, item_id: Uuid) -> Result<Option<Item>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM item i WHERE i.item_id = $1");
        let row = sqlx::query(&sql).bind(item_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_item).transpose()
    }

    async fn find_orders_with_items(&self, search: &OrderSearch) -> Result<Vec<OrderJoinRow>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, {MEMBER_COLUMNS}, {DELIVERY_COLUMNS}, {ORDER_ITEM_COLUMNS}, {ITEM_COLUMNS}
             FROM orders o
             JOIN member m ON m.member_id = o.member_id
             JOIN delivery d ON d.delivery_id = o.delivery_id
             JOIN order_item oi ON oi.order_id = o.order_id
             JOIN item i ON i.item_id = oi.item_id
             WHERE {SEARCH_FILTER}
             ORDER BY o.order_id, oi.order_item_id"
        );
        let rows = bind_search(sqlx::query(&sql), search).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(OrderJoinRow {
                    order: decode_order(row)?,
                    member: decode_member(row)?,
                    delivery: decode_delivery(row)?,
                    order_item: decode_order_item(row)?,
                    item: decode_item(row)?,
                })
            })
            .collect()
    }

    async fn find_orders_with_member_delivery(
        &self,
        search: &OrderSearch,
        page: Option<Page>,
    ) -> Result<Vec<OrderToOneRow>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, {MEMBER_COLUMNS}, {DELIVERY_COLUMNS}
             FROM orders o
             JOIN member m ON m.member_id = o.member_id
             JOIN delivery d ON d.delivery_id = o.delivery_id
             WHERE {SEARCH_FILTER}
             ORDER BY o.order_id
             OFFSET $4 LIMIT $5"
        );
        // LIMIT NULL means no limit in Postgres
        let rows = bind_search(sqlx::query(&sql), search)
            .bind(page.map_or(0, |p| p.offset()))
            .bind(page.map(|p| p.limit()))
            .fetch_all(&self.pool)
            .await?;
        decode_all(&rows, decode_to_one)
    }

    async fn find_order_with_member_delivery(&self, order_id: Uuid) -> Result<Option<OrderToOneRow>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, {MEMBER_COLUMNS}, {DELIVERY_COLUMNS}
             FROM orders o
             JOIN member m ON m.member_id = o.member_id
             JOIN delivery d ON d.delivery_id = o.delivery_id
             WHERE o.order_id = $1"
        );
        let row = sqlx::query(&sql).bind(order_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_to_one).transpose()
    }

    async fn find_order_items_by_order_ids(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItemRow>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_item oi
             WHERE oi.order_id = ANY($1)
             ORDER BY oi.order_id, oi.order_item_id"
        );
        let rows = sqlx::query(&sql).bind(order_ids).fetch_all(&self.pool).await?;
        decode_all(&rows, decode_order_item)
    }

    async fn find_items_by_ids(&self, item_ids: &[Uuid]) -> Result<Vec<Item>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM item i WHERE i.item_id = ANY($1)");
        let rows = sqlx::query(&sql).bind(item_ids).fetch_all(&self.pool).await?;
        decode_all(&rows, decode_item)
    }

    async fn find_order_query_rows(&self, search: &OrderSearch) -> Result<Vec<OrderQueryRow>, StoreError> {
        let sql = format!(
            "SELECT o.order_id, o.order_date, o.status, m.name AS m_name,
                    d.city AS d_city, d.street AS d_street, d.zipcode AS d_zipcode
             FROM orders o
             JOIN member m ON m.member_id = o.member_id
             JOIN delivery d ON d.delivery_id = o.delivery_id
             WHERE {SEARCH_FILTER}
             ORDER BY o.order_id"
        );
        let rows = bind_search(sqlx::query(&sql), search).fetch_all(&self.pool).await?;
        decode_all(&rows, decode_order_query)
    }

    async fn find_order_item_query_rows(&self, order_id: Uuid) -> Result<Vec<OrderItemQueryRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT oi.order_id AS oi_order_id, i.name AS i_name, oi.order_price, oi.count
             FROM order_item oi
             JOIN item i ON i.item_id = oi.item_id
             WHERE oi.order_id = $1
             ORDER BY oi.order_item_id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        decode_all(&rows, decode_item_query)
    }

    async fn find_order_item_query_rows_by_order_ids(
        &self,
        order_ids: &[Uuid],
    ) -> Result<Vec<OrderItemQueryRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT oi.order_id AS oi_order_id, i.name AS i_name, oi.order_price, oi.count
             FROM order_item oi
             JOIN item i ON i.item_id = oi.item_id
             WHERE oi.order_id = ANY($1)
             ORDER BY oi.order_id, oi.order_item_id",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;
        decode_all(&rows, decode_item_query)
    }

    async fn find_order_flat_rows(&self, search: &OrderSearch) -> Result<Vec<OrderFlatRow>, StoreError> {
        let sql = format!(
            "SELECT o.order_id, o.order_date, o.status, m.name AS m_name,
                    d.city AS d_city, d.street AS d_street, d.zipcode AS d_zipcode,
                    oi.order_item_id, i.name AS i_name, oi.order_price, oi.count
             FROM orders o
             JOIN member m ON m.member_id = o.member_id
             JOIN delivery d ON d.delivery_id = o.delivery_id
             JOIN order_item oi ON oi.order_id = o.order_id
             JOIN item i ON i.item_id = oi.item_id
             WHERE {SEARCH_FILTER}
             ORDER BY o.order_id, oi.order_item_id"
        );
        let rows = bind_search(sqlx::query(&sql), search).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let order = decode_order_query(row)?;
                Ok(OrderFlatRow {
                    order_id: order.order_id,
                    member_name: order.member_name,
                    order_date: order.order_date,
                    status: order.status,
                    address: order.address,
                    order_item_id: row.try_get("order_item_id")?,
                    item_name: row.try_get("i_name")?,
                    order_price: row.try_get("order_price")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    async fn apply(&self, changes: &[Change]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for change in changes {
            Self::apply_change(&mut tx, change).await?;
        }
        tx.commit().await?;

        tracing::debug!(change_count = changes.len(), "Committed change set to Postgres");
        Ok(())
    }
}
