use super::history::OrdersHistory;
use super::refunds::Refunds;
use super::users::Users;
use crate::domain::order::{Order, OrderStatus, OrderView, Status};
use crate::domain::ports::OrderStorage;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Full state of the in-process backend, as written to the snapshot file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub history: OrdersHistory,
    #[serde(default)]
    pub users: Users,
    #[serde(default)]
    pub refunds: Refunds,
}

impl Snapshot {
    fn check_removable(&self, order_id: u64) -> Result<&OrderStatus> {
        let record = self.history.get(order_id)?;
        if record.status.is_issued() {
            return Err(OrderError::WrongStatus(format!(
                "order {order_id} has already been {}",
                record.status
            )));
        }
        self.users.can_remove(record.user_id, order_id)?;
        Ok(record)
    }
}

/// In-process backend persisted as a single JSON snapshot.
///
/// The three stores sit behind one `RwLock`: reads share it, and every mutation holds the write
/// half for its whole check-then-act sequence, so no interleaving can leave the stores disagreeing.
///
/// Cloning shares the same underlying state.
#[derive(Debug, Default, Clone)]
pub struct JsonStorage {
    state: Arc<RwLock<Snapshot>>,
    path: Option<PathBuf>,
}

impl JsonStorage {
    /// Creates a store that is never written to disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the snapshot at `path`, creating an empty `{}` file when it doesn't exist.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Snapshot::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::write(&path, b"{}").await?;
                Snapshot::default()
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "Loaded order snapshot");

        Ok(Self {
            state: Arc::new(RwLock::new(snapshot)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

}

#[async_trait]
impl OrderStorage for JsonStorage {
    async fn add_order(
        &self,
        user_id: u64,
        order_id: u64,
        order: Order,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if let Ok(existing) = state.history.get(order_id) {
            return Err(OrderError::AlreadyExist(format!(
                "order {order_id} has already been {}",
                existing.status
            )));
        }

        state.users.add_order(user_id, order_id, order.clone())?;
        state
            .history
            .put(order_id, user_id, Status::Accepted, order, at)?;
        Ok(())
    }

    async fn get_order_status(&self, order_id: u64) -> Result<OrderStatus> {
        self.state.read().await.history.get(order_id).cloned()
    }

    async fn get_order(&self, user_id: u64, order_id: u64) -> Result<Order> {
        self.state.read().await.users.get(user_id, order_id)
    }

    async fn get_expiration_date(&self, user_id: u64, order_id: u64) -> Result<NaiveDate> {
        self.state
            .read()
            .await
            .users
            .get_expiration_date(user_id, order_id)
    }

    async fn can_remove_order(&self, order_id: u64) -> Result<()> {
        self.state.read().await.check_removable(order_id).map(|_| ())
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
        let mut state = self.state.write().await;

        let mut owners = Vec::with_capacity(order_ids.len());
        let mut errors = Vec::new();
        for order_id in order_ids {
            match state.check_removable(order_id) {
                Ok(record) => owners.push((order_id, record.user_id)),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(OrderError::batch(errors));
        }

        for (order_id, user_id) in owners {
            state.users.remove(user_id, order_id)?;
            state.history.set_status(order_id, status, at)?;
        }
        Ok(())
    }

    async fn set_order_status(
        &self,
        order_id: u64,
        status: Status,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.state
            .write()
            .await
            .history
            .set_status(order_id, status, at)
    }

    async fn add_refund(
        &self,
        user_id: u64,
        order_id: u64,
        order: Order,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state.history.get(order_id)?;
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

        state.refunds.add(user_id, order_id, order)?;
        state.history.set_status(order_id, Status::Returned, at)
    }

    async fn remove_refund(&self, order_id: u64, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        let status = state.history.get_status_only(order_id)?;
        if status != Status::Returned {
            return Err(OrderError::WrongStatus(format!(
                "can't return order {order_id}: status = {status}"
            )));
        }

        state.refunds.remove(order_id)?;
        state
            .history
            .set_status(order_id, Status::IssuedToCourier, at)
    }

    async fn get_orders_by_user(
        &self,
        user_id: u64,
        first_order_id: u64,
        limit: u64,
    ) -> Result<Vec<OrderView>> {
        self.state
            .read()
            .await
            .users
            .list(user_id, first_order_id, limit)
    }

    async fn get_refunds(&self, page: u64, per_page: u64) -> Result<Vec<OrderView>> {
        self.state.read().await.refunds.list(page, per_page)
    }

    async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = {
            let state = self.state.read().await;
            serde_json::to_vec_pretty(&*state)?
        };
        // Staged beside the snapshot, then renamed over it.
        let mut staging = path.clone().into_os_string();
        staging.push(".tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, path).await?;
        tracing::info!(path = %path.display(), "Saved order snapshot");
        Ok(())
    }
}
