use super::event::Event;
use super::order::{Order, OrderStatus, OrderView, Status};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Storage facade over the order history, the per-user order lists and the refund queue.
///
/// Every mutating method is atomic across the stores it touches and re-validates the status it
/// depends on inside its own critical section, so two concurrent callers cannot both act on the
/// same pre-transition state. `at` is stamped into the status record as its last update.
#[async_trait]
pub trait OrderStorage: Send + Sync {
    /// Fails with `AlreadyExist` if the order id was ever accepted, whatever its status now.
    async fn add_order(
        &self,
        user_id: u64,
        order_id: u64,
        order: Order,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn get_order_status(&self, order_id: u64) -> Result<OrderStatus>;

    async fn get_order(&self, user_id: u64, order_id: u64) -> Result<Order>;

    async fn get_expiration_date(&self, user_id: u64, order_id: u64) -> Result<NaiveDate>;

    /// Pre-flight check for issuing: the order exists, is not issued yet and is still held
    /// for its owner.
    async fn can_remove_order(&self, order_id: u64) -> Result<()>;

    /// Takes every order out of its owner's list and moves it to `status`.
    ///
    /// All orders are checked before any is touched; one failure applies nothing. A repeated id
    /// counts once.
    async fn remove_orders(&self, order_ids: &[u64], status: Status, at: DateTime<Utc>)
    -> Result<()>;

    async fn remove_order(&self, order_id: u64, status: Status, at: DateTime<Utc>) -> Result<()> {
        self.remove_orders(&[order_id], status, at).await
    }

    /// Rewrites the status without checking that the transition is legal.
    async fn set_order_status(&self, order_id: u64, status: Status, at: DateTime<Utc>)
    -> Result<()>;

    /// Queues an order issued to its client for refund and marks it `returned`.
    async fn add_refund(
        &self,
        user_id: u64,
        order_id: u64,
        order: Order,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Takes a `returned` order off the refund queue and marks it `issued_to_courier`.
    async fn remove_refund(&self, order_id: u64, at: DateTime<Utc>) -> Result<()>;

    /// Live orders of a user starting at `first_order_id` (0 = from the start);
    /// `limit` 0 means no cap.
    async fn get_orders_by_user(
        &self,
        user_id: u64,
        first_order_id: u64,
        limit: u64,
    ) -> Result<Vec<OrderView>>;

    /// Refund queue page, `page` starting at 1.
    async fn get_refunds(&self, page: u64, per_page: u64) -> Result<Vec<OrderView>>;

    /// Flushes state to durable storage, where the backend needs it.
    async fn save(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: Event) -> Result<()>;
}

pub type OrderStorageBox = Box<dyn OrderStorage>;
pub type EventSinkBox = Box<dyn EventSink>;
