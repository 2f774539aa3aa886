use crate::domain::clock::Clock;
use crate::domain::event::{Event, EventKind};
use crate::domain::order::{
    Order, OrderView, REFUND_WINDOW, RETURN_GRACE, Status, format_date, start_of_day,
};
use crate::domain::packaging::{PackageKind, Packaging};
use crate::domain::ports::{EventSinkBox, OrderStorage, OrderStorageBox};
use crate::error::{OrderError, Result};
use chrono::NaiveDate;
use std::sync::Arc;

/// Parameters of an accept request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptOrder {
    pub user_id: u64,
    pub order_id: u64,
    pub expiration_date: NaiveDate,
    pub package: PackageKind,
    pub wrap: bool,
    pub weight: u64,
    pub base_cost: u64,
}

/// The pickup point's use cases.
///
/// `OrderService` owns the storage backend, the clock every date guard reads, and an optional
/// event sink. It decides whether a request is legal for the order's current state; the storage
/// re-checks the state it mutates so a concurrent request cannot slip in between.
pub struct OrderService {
    storage: OrderStorageBox,
    clock: Arc<dyn Clock>,
    events: Option<EventSinkBox>,
}

impl OrderService {
    pub fn new(storage: OrderStorageBox, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventSinkBox) -> Self {
        self.events = Some(events);
        self
    }

    pub fn storage(&self) -> &dyn OrderStorage {
        self.storage.as_ref()
    }

    /// Prices the parcel and registers it as `accepted` for its user.
    pub async fn accept_order(&self, request: AcceptOrder) -> Result<Order> {
        let order_id = request.order_id;
        let result = self.try_accept_order(request).await;
        self.emit(vec![order_id], EventKind::Accepted, &result).await;
        result
    }

    async fn try_accept_order(&self, request: AcceptOrder) -> Result<Order> {
        let now = self.clock.now();
        if now.date_naive() > request.expiration_date {
            return Err(OrderError::ExpirationDatePassed(format!(
                "can't accept order {}: expired on {}",
                request.order_id,
                format_date(request.expiration_date)
            )));
        }

        let packaging = Packaging::with_wrap(request.package, request.wrap)?;
        let order = Order::new(
            request.expiration_date,
            request.weight,
            request.base_cost,
            packaging,
        )?;
        self.storage
            .add_order(request.user_id, request.order_id, order.clone(), now)
            .await?;

        tracing::debug!(
            order_id = request.order_id,
            user_id = request.user_id,
            cost = order.cost,
            "Accepted order"
        );
        Ok(order)
    }

    /// Takes back an order its client refuses within the refund window.
    pub async fn accept_refund(&self, user_id: u64, order_id: u64) -> Result<()> {
        let result = self.try_accept_refund(user_id, order_id).await;
        self.emit(vec![order_id], EventKind::Returned, &result).await;
        result
    }

    async fn try_accept_refund(&self, user_id: u64, order_id: u64) -> Result<()> {
        let record = self.storage.get_order_status(order_id).await?;
        if !record.status.can_transition_to(Status::Returned) {
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

        let now = self.clock.now();
        if now > record.updated_at + REFUND_WINDOW {
            return Err(OrderError::TwoDaysPassed(format!(
                "can't refund order {order_id}: issued on {}",
                record.updated_at.format("%d-%m-%Y %H:%M:%S")
            )));
        }

        self.storage
            .add_refund(user_id, order_id, record.order, now)
            .await?;
        tracing::debug!(order_id, user_id, "Accepted refund");
        Ok(())
    }

    /// Issues a batch of orders to their client.
    ///
    /// Duplicate ids are collapsed. Every order must belong to the owner of the first (lowest)
    /// id; all of them are validated before any is issued, and a single failure issues none.
    pub async fn give(&self, order_ids: &[u64]) -> Result<Vec<u64>> {
        let mut ids = order_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let result = self.try_give(&ids).await.map(|()| ids.clone());
        self.emit(ids, EventKind::IssuedToClient, &result).await;
        result
    }

    async fn try_give(&self, ids: &[u64]) -> Result<()> {
        if ids.is_empty() {
            return Err(OrderError::WrongInput("no orders to give".to_string()));
        }

        let today = self.clock.now().date_naive();
        let mut owner = None;
        let mut errors = Vec::new();
        for &order_id in ids {
            if let Err(e) = self.check_give(order_id, &mut owner, today).await {
                tracing::debug!(order_id, error = %e, "Order can't be given");
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            return Err(OrderError::batch(errors));
        }

        self.storage
            .remove_orders(ids, Status::IssuedToClient, self.clock.now())
            .await?;
        tracing::debug!(orders = ?ids, user_id = ?owner, "Gave orders");
        Ok(())
    }

    async fn check_give(
        &self,
        order_id: u64,
        owner: &mut Option<u64>,
        today: NaiveDate,
    ) -> Result<()> {
        let record = self.storage.get_order_status(order_id).await?;
        let user_id = *owner.get_or_insert(record.user_id);
        if record.user_id != user_id {
            return Err(OrderError::WrongInput(format!(
                "can't give order {order_id}: different user id"
            )));
        }
        if !record.status.can_transition_to(Status::IssuedToClient) {
            return Err(OrderError::WrongStatus(format!(
                "can't give order {order_id}: status = {}",
                record.status
            )));
        }

        let expiration_date = self
            .storage
            .get_expiration_date(record.user_id, order_id)
            .await?;
        if today > expiration_date {
            return Err(OrderError::ExpirationDatePassed(format!(
                "can't give order {order_id}: expired on {}",
                format_date(expiration_date)
            )));
        }

        self.storage.can_remove_order(order_id).await
    }

    /// Hands an order over to the courier: a refunded order leaves the refund queue, an
    /// unclaimed one leaves its user's list once it is a full day past expiration.
    pub async fn return_order(&self, order_id: u64) -> Result<()> {
        let result = self.try_return_order(order_id).await;
        self.emit(vec![order_id], EventKind::IssuedToCourier, &result)
            .await;
        result
    }

    async fn try_return_order(&self, order_id: u64) -> Result<()> {
        let record = self.storage.get_order_status(order_id).await?;
        let now = self.clock.now();

        match record.status {
            Status::Returned => {
                self.storage.remove_refund(order_id, now).await?;
            }
            Status::Accepted => {
                let expiration_date = self
                    .storage
                    .get_expiration_date(record.user_id, order_id)
                    .await?;
                let expires_at = start_of_day(expiration_date);
                if now <= expires_at + RETURN_GRACE {
                    return Err(OrderError::NotExpirationDate(format!(
                        "can't return order {order_id}: expires on {}",
                        format_date(expiration_date)
                    )));
                }
                self.storage
                    .remove_order(order_id, Status::IssuedToCourier, now)
                    .await?;
            }
            status => {
                return Err(OrderError::WrongStatus(format!(
                    "can't return order {order_id}: status = {status}"
                )));
            }
        }

        tracing::debug!(order_id, from = %record.status, "Returned order to courier");
        Ok(())
    }

    /// Live orders of a user. An empty page is `NotFound`.
    pub async fn get_orders(
        &self,
        user_id: u64,
        first_order_id: u64,
        limit: u64,
    ) -> Result<Vec<OrderView>> {
        let orders = self
            .storage
            .get_orders_by_user(user_id, first_order_id, limit)
            .await?;
        if orders.is_empty() {
            return Err(OrderError::NotFound(format!(
                "user {user_id} doesn't have orders"
            )));
        }
        Ok(orders)
    }

    /// A page of the refund queue. An empty page is `NotFound`.
    pub async fn get_refunds(&self, page: u64, per_page: u64) -> Result<Vec<OrderView>> {
        let refunds = self.storage.get_refunds(page, per_page).await?;
        if refunds.is_empty() {
            return Err(OrderError::NotFound(format!(
                "there are no refunds for page {page} with {per_page} orders per page"
            )));
        }
        Ok(refunds)
    }

    /// Publishes the outcome of a mutation. Domain rejections stay silent; a failing sink is
    /// logged and never fails the operation.
    async fn emit<T>(&self, order_ids: Vec<u64>, kind: EventKind, outcome: &Result<T>) {
        let Some(events) = &self.events else {
            return;
        };
        let error = match outcome {
            Ok(_) => None,
            Err(e) if e.is_service_error() => Some(e.to_string()),
            Err(_) => return,
        };

        let event = Event::new(order_ids, kind, error, self.clock.now());
        if let Err(e) = events.publish(event).await {
            tracing::warn!(error = %e, "Failed to publish order event");
        }
    }
}
