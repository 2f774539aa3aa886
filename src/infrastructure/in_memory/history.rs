use crate::domain::order::{Order, OrderStatus, Status};
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One status record per order id ever accepted. Records are never deleted.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrdersHistory {
    statuses: HashMap<u64, OrderStatus>,
}

impl OrdersHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(
        &mut self,
        order_id: u64,
        user_id: u64,
        status: Status,
        order: Order,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(existing) = self.statuses.get(&order_id) {
            return Err(OrderError::AlreadyExist(format!(
                "order {order_id} has already been {}",
                existing.status
            )));
        }
        self.statuses.insert(
            order_id,
            OrderStatus {
                order,
                status,
                user_id,
                updated_at: at,
            },
        );
        Ok(())
    }

    pub fn get(&self, order_id: u64) -> Result<&OrderStatus> {
        self.statuses
            .get(&order_id)
            .ok_or_else(|| OrderError::NotFound(format!("order {order_id} not found")))
    }

    pub fn get_status_only(&self, order_id: u64) -> Result<Status> {
        self.get(order_id).map(|record| record.status)
    }

    pub fn set_status(&mut self, order_id: u64, status: Status, at: DateTime<Utc>) -> Result<()> {
        let record = self
            .statuses
            .get_mut(&order_id)
            .ok_or_else(|| OrderError::NotFound(format!("order {order_id} not found")))?;
        record.status = status;
        record.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::packaging::PackageKind;
    use chrono::{NaiveDate, TimeDelta};

    fn order() -> Order {
        Order {
            expiration_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            package: PackageKind::Box,
            weight: 100,
            cost: 120,
            use_tape: false,
        }
    }

    #[test]
    fn test_put_and_get() {
        let mut history = OrdersHistory::new();
        let at = Utc::now();
        history.put(1, 10, Status::Accepted, order(), at).unwrap();

        let record = history.get(1).unwrap();
        assert_eq!(record.user_id, 10);
        assert_eq!(record.status, Status::Accepted);
        assert_eq!(record.order, order());
        assert_eq!(record.updated_at, at);
        assert!(matches!(history.get(2), Err(OrderError::NotFound(_))));
    }

    #[test]
    fn test_put_twice_fails_whatever_the_status() {
        let mut history = OrdersHistory::new();
        let at = Utc::now();
        history.put(1, 10, Status::Accepted, order(), at).unwrap();
        history.set_status(1, Status::IssuedToCourier, at).unwrap();

        match history.put(1, 11, Status::Accepted, order(), at) {
            Err(OrderError::AlreadyExist(message)) => assert!(message.contains("issued to courier")),
            other => panic!("expected AlreadyExist, got {other:?}"),
        }
    }

    #[test]
    fn test_set_status_stamps_update_time() {
        let mut history = OrdersHistory::new();
        let at = Utc::now();
        history.put(1, 10, Status::Accepted, order(), at).unwrap();
        history
            .set_status(1, Status::IssuedToClient, at + TimeDelta::hours(1))
            .unwrap();

        assert_eq!(history.get_status_only(1).unwrap(), Status::IssuedToClient);
        assert_eq!(history.get(1).unwrap().updated_at, at + TimeDelta::hours(1));
        assert!(matches!(
            history.set_status(5, Status::Returned, at),
            Err(OrderError::NotFound(_))
        ));
    }
}
