use super::arena::ViewArena;
use crate::domain::order::{Order, OrderView};
use crate::error::{OrderError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Orders a single user currently has waiting at the pickup point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOrders {
    user_id: u64,
    /// Live orders only.
    orders: HashMap<u64, Order>,
    arena: ViewArena,
}

impl UserOrders {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            orders: HashMap::new(),
            arena: ViewArena::new(),
        }
    }

    fn add(&mut self, order_id: u64, order: Order) -> Result<()> {
        if self.arena.position(order_id).is_some() {
            return Err(OrderError::AlreadyExist(format!(
                "order {order_id} has already been accepted for user {}",
                self.user_id
            )));
        }
        self.arena
            .push(OrderView::new(self.user_id, order_id, order.clone()))?;
        self.orders.insert(order_id, order);
        Ok(())
    }

    fn get(&self, order_id: u64) -> Result<&Order> {
        self.orders.get(&order_id).ok_or_else(|| {
            OrderError::NotFound(format!(
                "user {} doesn't have order {order_id}",
                self.user_id
            ))
        })
    }

    fn remove(&mut self, order_id: u64) -> Result<()> {
        self.get(order_id)?;
        self.arena.tombstone(order_id)?;
        self.orders.remove(&order_id);
        Ok(())
    }

    fn list(&self, first_order_id: u64, limit: u64) -> Result<Vec<OrderView>> {
        let offset = if first_order_id == 0 {
            0
        } else {
            self.arena.position(first_order_id).ok_or_else(|| {
                OrderError::NotFound(format!(
                    "order {first_order_id} not found for user {}",
                    self.user_id
                ))
            })?
        };
        let limit = (limit != 0).then(|| usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(self.arena.scan(offset, limit))
    }
}

/// All users' order lists, created lazily on first accept.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Users {
    users: HashMap<u64, UserOrders>,
}

impl Users {
    pub fn new() -> Self {
        Self::default()
    }

    fn user(&self, user_id: u64) -> Result<&UserOrders> {
        self.users
            .get(&user_id)
            .ok_or_else(|| OrderError::NotFound(format!("user {user_id} not found")))
    }

    fn user_mut(&mut self, user_id: u64) -> Result<&mut UserOrders> {
        self.users
            .get_mut(&user_id)
            .ok_or_else(|| OrderError::NotFound(format!("user {user_id} not found")))
    }

    pub fn add_order(&mut self, user_id: u64, order_id: u64, order: Order) -> Result<()> {
        self.users
            .entry(user_id)
            .or_insert_with(|| UserOrders::new(user_id))
            .add(order_id, order)
    }

    pub fn get(&self, user_id: u64, order_id: u64) -> Result<Order> {
        self.user(user_id)?.get(order_id).cloned()
    }

    pub fn can_remove(&self, user_id: u64, order_id: u64) -> Result<()> {
        self.user(user_id)?.get(order_id).map(|_| ())
    }

    pub fn remove(&mut self, user_id: u64, order_id: u64) -> Result<()> {
        self.user_mut(user_id)?.remove(order_id)
    }

    pub fn get_expiration_date(&self, user_id: u64, order_id: u64) -> Result<NaiveDate> {
        self.user(user_id)?
            .get(order_id)
            .map(|order| order.expiration_date)
    }

    pub fn list(&self, user_id: u64, first_order_id: u64, limit: u64) -> Result<Vec<OrderView>> {
        self.user(user_id)?.list(first_order_id, limit)
    }
}
