use super::rows::{OrderRow, ViewRow, is_unique_violation, order_from_row, to_db, view_from_row};
use crate::domain::order::{Order, OrderView};
use crate::error::{OrderError, Result};
use sqlx::PgConnection;

const VIEW_COLUMNS: &str =
    "user_id, order_id, expiration_date, package_type, weight, cost, use_tape";

/// The two append-only view tables. Both share one layout: a `seq` position, the order columns
/// and a `live` tombstone flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTable {
    Orders,
    Refunds,
}

impl ViewTable {
    fn name(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Refunds => "refunds",
        }
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    table: ViewTable,
    user_id: u64,
    order_id: u64,
    order: &Order,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} ({VIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        table.name()
    );
    let result = sqlx::query(&sql)
        .bind(to_db(user_id)?)
        .bind(to_db(order_id)?)
        .bind(order.expiration_date)
        .bind(order.package.as_str())
        .bind(to_db(order.weight)?)
        .bind(to_db(order.cost)?)
        .bind(order.use_tape)
        .execute(&mut *conn)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(OrderError::AlreadyExist(format!(
            "order {order_id} is already in {}",
            table.name()
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Live order owned by `user_id`.
pub async fn find_live(
    conn: &mut PgConnection,
    user_id: u64,
    order_id: u64,
) -> Result<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(
        "SELECT expiration_date, package_type, weight, cost, use_tape
         FROM orders
         WHERE user_id = $1 AND order_id = $2 AND live",
    )
    .bind(to_db(user_id)?)
    .bind(to_db(order_id)?)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(order_from_row).transpose()
}

pub async fn tombstone(conn: &mut PgConnection, table: ViewTable, order_id: u64) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET live = FALSE WHERE order_id = $1 AND live",
        table.name()
    );
    let result = sqlx::query(&sql)
        .bind(to_db(order_id)?)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(OrderError::NotFound(format!(
            "order {order_id} is not in {}",
            table.name()
        )));
    }
    Ok(())
}

pub async fn has_user(conn: &mut PgConnection, user_id: u64) -> Result<bool> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1)")
            .bind(to_db(user_id)?)
            .fetch_one(&mut *conn)
            .await?;
    Ok(exists)
}

/// Position of a user's order, tombstoned or not.
pub async fn position(conn: &mut PgConnection, user_id: u64, order_id: u64) -> Result<Option<i64>> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT seq FROM orders WHERE user_id = $1 AND order_id = $2")
            .bind(to_db(user_id)?)
            .bind(to_db(order_id)?)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(|(seq,)| seq))
}

/// Live orders of `user_id` from position `from_seq` on. `LIMIT NULL` scans to the end.
pub async fn scan_user(
    conn: &mut PgConnection,
    user_id: u64,
    from_seq: i64,
    limit: Option<i64>,
) -> Result<Vec<OrderView>> {
    let sql = format!(
        "SELECT {VIEW_COLUMNS}
         FROM orders
         WHERE user_id = $1 AND seq >= $2 AND live
         ORDER BY seq
         LIMIT $3"
    );
    let rows: Vec<ViewRow> = sqlx::query_as(&sql)
        .bind(to_db(user_id)?)
        .bind(from_seq)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(view_from_row).collect()
}

/// Skips `offset` raw slots, tombstones included, then collects up to `limit` live refunds.
pub async fn scan_refunds(
    conn: &mut PgConnection,
    offset: i64,
    limit: i64,
) -> Result<Vec<OrderView>> {
    let sql = format!(
        "SELECT {VIEW_COLUMNS}
         FROM (SELECT * FROM refunds ORDER BY seq OFFSET $1) AS slots
         WHERE live
         ORDER BY seq
         LIMIT $2"
    );
    let rows: Vec<ViewRow> = sqlx::query_as(&sql)
        .bind(offset)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(view_from_row).collect()
}
