use super::tx_manager::TxManager;
use super::views::{self, ViewTable};
use super::{history, rows::to_db};
use crate::domain::order::{Order, OrderStatus, OrderView, Status};
use crate::domain::ports::OrderStorage;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

const SCHEMA: &str = include_str!("schema.sql");

/// Relational backend. Every operation runs in its own transaction at the isolation level its
/// check-then-act sequence needs:
///
/// * accepting an order: read committed, the primary keys reject duplicates
/// * reads: read committed, read only
/// * issuing, status rewrites and refund moves: serializable
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    tx: TxManager,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tx: TxManager::new(pool),
        }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        tracing::debug!("Connected to postgres");
        Ok(Self::new(pool))
    }

    /// Creates the tables when they don't exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(self.tx.pool()).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        self.tx.pool()
    }
}

async fn check_removable(conn: &mut PgConnection, order_id: u64) -> Result<OrderStatus> {
    let record = history::get(conn, order_id).await?;
    if record.status.is_issued() {
        return Err(OrderError::WrongStatus(format!(
            "order {order_id} has already been {}",
            record.status
        )));
    }
    if views::find_live(conn, record.user_id, order_id)
        .await?
        .is_none()
    {
        return Err(OrderError::NotFound(format!(
            "user {} doesn't have order {order_id}",
            record.user_id
        )));
    }
    Ok(record)
}

async fn live_order(conn: &mut PgConnection, user_id: u64, order_id: u64) -> Result<Order> {
    if !views::has_user(conn, user_id).await? {
        return Err(OrderError::NotFound(format!("user {user_id} not found")));
    }
    views::find_live(conn, user_id, order_id)
        .await?
        .ok_or_else(|| OrderError::NotFound(format!("user {user_id} doesn't have order {order_id}")))
}

#[async_trait]
impl OrderStorage for PostgresStorage {
    async fn add_order(
        &self,
        user_id: u64,
        order_id: u64,
        order: Order,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.tx.read_committed().await?;
        if let Some(existing) = history::find(&mut tx, order_id).await? {
            return Err(OrderError::AlreadyExist(format!(
                "order {order_id} has already been {}",
                existing.status
            )));
        }

        views::insert(&mut tx, ViewTable::Orders, user_id, order_id, &order).await?;
        history::insert(&mut tx, order_id, user_id, Status::Accepted, &order, at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_order_status(&self, order_id: u64) -> Result<OrderStatus> {
        let mut tx = self.tx.read_only_committed().await?;
        let record = history::get(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn get_order(&self, user_id: u64, order_id: u64) -> Result<Order> {
        let mut tx = self.tx.read_only_committed().await?;
        let order = live_order(&mut tx, user_id, order_id).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn get_expiration_date(&self, user_id: u64, order_id: u64) -> Result<NaiveDate> {
        self.get_order(user_id, order_id)
            .await
            .map(|order| order.expiration_date)
    }

    async fn can_remove_order(&self, order_id: u64) -> Result<()> {
        let mut tx = self.tx.read_only_committed().await?;
        check_removable(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_orders(
        &self,
        order_ids: &[u64],
        status: Status,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut order_ids = order_ids.to_vec();
        order_ids.sort_unstable();
        order_ids.dedup();
        let mut tx = self.tx.serializable().await?;

        let mut errors = Vec::new();
        for &order_id in &order_ids {
            if let Err(e) = check_removable(&mut tx, order_id).await {
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            return Err(OrderError::batch(errors));
        }

        for &order_id in &order_ids {
            views::tombstone(&mut tx, ViewTable::Orders, order_id).await?;
            history::set_status(&mut tx, order_id, status, at).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_order_status(
        &self,
        order_id: u64,
        status: Status,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.tx.serializable().await?;
        history::set_status(&mut tx, order_id, status, at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_refund(
        &self,
        user_id: u64,
        order_id: u64,
        order: Order,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.tx.serializable().await?;
        let record = history::get(&mut tx, order_id).await?;
        if record.status != Status::IssuedToClient {
            return Err(OrderError::WrongStatus(format!(
                "can't refund order {order_id}: status = {}",
                record.status
            )));
        }
        if record.user_id != user_id {
            return Err(OrderError::WrongInput(format!(
                "can't refund order {order_id}: wrong user id"
            )));
        }

        views::insert(&mut tx, ViewTable::Refunds, user_id, order_id, &order).await?;
        history::set_status(&mut tx, order_id, Status::Returned, at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_refund(&self, order_id: u64, at: DateTime<Utc>) -> Result<()> {
        let mut tx = self.tx.serializable().await?;
        let status = history::get_status_only(&mut tx, order_id).await?;
        if status != Status::Returned {
            return Err(OrderError::WrongStatus(format!(
                "can't return order {order_id}: status = {status}"
            )));
        }

        views::tombstone(&mut tx, ViewTable::Refunds, order_id).await?;
        history::set_status(&mut tx, order_id, Status::IssuedToCourier, at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_orders_by_user(
        &self,
        user_id: u64,
        first_order_id: u64,
        limit: u64,
    ) -> Result<Vec<OrderView>> {
        let mut tx = self.tx.read_only_committed().await?;
        if !views::has_user(&mut tx, user_id).await? {
            return Err(OrderError::NotFound(format!("user {user_id} not found")));
        }

        let from_seq = if first_order_id == 0 {
            0
        } else {
            views::position(&mut tx, user_id, first_order_id)
                .await?
                .ok_or_else(|| {
                    OrderError::NotFound(format!(
                        "order {first_order_id} not found for user {user_id}"
                    ))
                })?
        };
        let limit = if limit == 0 {
            None
        } else {
            Some(i64::try_from(limit).unwrap_or(i64::MAX))
        };

        let views = views::scan_user(&mut tx, user_id, from_seq, limit).await?;
        tx.commit().await?;
        Ok(views)
    }

    async fn get_refunds(&self, page: u64, per_page: u64) -> Result<Vec<OrderView>> {
        if per_page == 0 {
            return Err(OrderError::WrongInput(
                "orders per page must be greater than 0".to_string(),
            ));
        }
        if page == 0 {
            return Err(OrderError::WrongInput(
                "page must be greater than 0".to_string(),
            ));
        }
        let offset = (page - 1).saturating_mul(per_page);

        let mut tx = self.tx.read_only_committed().await?;
        let views = views::scan_refunds(
            &mut tx,
            to_db(offset).unwrap_or(i64::MAX),
            to_db(per_page).unwrap_or(i64::MAX),
        )
        .await?;
        tx.commit().await?;
        Ok(views)
    }
}
