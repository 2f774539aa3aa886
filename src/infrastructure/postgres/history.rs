use super::rows::{HistoryRow, is_unique_violation, status_from_row, to_db};
use crate::domain::order::{Order, OrderStatus, Status};
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

pub async fn insert(
    conn: &mut PgConnection,
    order_id: u64,
    user_id: u64,
    status: Status,
    order: &Order,
    at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        "INSERT INTO orders_history (
            order_id, user_id, expiration_date, package_type, weight, cost, use_tape,
            status, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(to_db(order_id)?)
    .bind(to_db(user_id)?)
    .bind(order.expiration_date)
    .bind(order.package.as_str())
    .bind(to_db(order.weight)?)
    .bind(to_db(order.cost)?)
    .bind(order.use_tape)
    .bind(status.as_str())
    .bind(at)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(OrderError::AlreadyExist(format!(
            "order {order_id} has already been accepted"
        ))),
        Err(e) => Err(e.into()),
    }
}

pub async fn find(conn: &mut PgConnection, order_id: u64) -> Result<Option<OrderStatus>> {
    let row: Option<HistoryRow> = sqlx::query_as(
        "SELECT user_id, expiration_date, package_type, weight, cost, use_tape, status, updated_at
         FROM orders_history
         WHERE order_id = $1",
    )
    .bind(to_db(order_id)?)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(status_from_row).transpose()
}

pub async fn get(conn: &mut PgConnection, order_id: u64) -> Result<OrderStatus> {
    find(conn, order_id)
        .await?
        .ok_or_else(|| OrderError::NotFound(format!("order {order_id} not found")))
}

pub async fn get_status_only(conn: &mut PgConnection, order_id: u64) -> Result<Status> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT status FROM orders_history WHERE order_id = $1")
            .bind(to_db(order_id)?)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some((status,)) => status.parse(),
        None => Err(OrderError::NotFound(format!("order {order_id} not found"))),
    }
}

pub async fn set_status(
    conn: &mut PgConnection,
    order_id: u64,
    status: Status,
    at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE orders_history SET status = $2, updated_at = $3 WHERE order_id = $1",
    )
    .bind(to_db(order_id)?)
    .bind(status.as_str())
    .bind(at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(OrderError::NotFound(format!("order {order_id} not found")));
    }
    Ok(())
}
