use crate::domain::order::OrderView;
use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Append-only list of order views with an `order id → position` index.
///
/// Removal only clears the `exists` flag, so a position handed out as a pagination cursor stays
/// valid for the life of the arena. The list and its index live in one struct and are only ever
/// changed together.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ViewArena {
    entries: Vec<OrderView>,
    positions: HashMap<u64, usize>,
}

impl ViewArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a live entry and returns its position.
    pub fn push(&mut self, view: OrderView) -> Result<usize> {
        if self.positions.contains_key(&view.order_id) {
            return Err(OrderError::AlreadyExist(format!(
                "order {} is already listed",
                view.order_id
            )));
        }
        let position = self.entries.len();
        self.positions.insert(view.order_id, position);
        self.entries.push(view);
        Ok(position)
    }

    /// Position of the order, tombstoned or not.
    pub fn position(&self, order_id: u64) -> Option<usize> {
        self.positions.get(&order_id).copied()
    }

    pub fn tombstone(&mut self, order_id: u64) -> Result<()> {
        match self.position(order_id) {
            Some(position) if self.entries[position].exists => {
                self.entries[position].exists = false;
                Ok(())
            }
            _ => Err(OrderError::NotFound(format!("order {order_id} is not listed"))),
        }
    }

    /// Collects up to `limit` live entries starting at `offset`; `None` scans to the end.
    pub fn scan(&self, offset: usize, limit: Option<usize>) -> Vec<OrderView> {
        let live = self
            .entries
            .iter()
            .skip(offset)
            .filter(|view| view.exists)
            .cloned();
        match limit {
            Some(limit) => live.take(limit).collect(),
            None => live.collect(),
        }
    }
}
