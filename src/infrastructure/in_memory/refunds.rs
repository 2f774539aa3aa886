use super::arena::ViewArena;
use crate::domain::order::{Order, OrderView};
use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};

/// Queue of orders returned by their clients, paginated by page number.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Refunds {
    arena: ViewArena,
}

impl Refunds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, user_id: u64, order_id: u64, order: Order) -> Result<()> {
        self.arena
            .push(OrderView::new(user_id, order_id, order))
            .map(|_| ())
    }

    pub fn remove(&mut self, order_id: u64) -> Result<()> {
        self.arena
            .tombstone(order_id)
            .map_err(|_| OrderError::NotFound(format!("order {order_id} is not in refunds")))
    }

    /// `page` starts at 1; the page offset counts array slots, tombstoned ones included.
    pub fn list(&self, page: u64, per_page: u64) -> Result<Vec<OrderView>> {
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

        let offset = (page - 1)
            .checked_mul(per_page)
            .and_then(|offset| usize::try_from(offset).ok())
            .unwrap_or(usize::MAX);
        let limit = usize::try_from(per_page).unwrap_or(usize::MAX);
        Ok(self.arena.scan(offset, Some(limit)))
    }
}
