use super::service::{AcceptOrder, OrderService};
use crate::domain::order::{OrderView, format_date};
use crate::error::Result;

/// One use-case request, as submitted to the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Accept(AcceptOrder),
    Refund { user_id: u64, order_id: u64 },
    Give { order_ids: Vec<u64> },
    Return { order_id: u64 },
    Orders { user_id: u64, first_order_id: u64, limit: u64 },
    Refunds { page: u64, per_page: u64 },
}

/// One line of a command file: a use case for the workers, or a request about the pool itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Run(Command),
    /// Drain the pool, then run it with this many workers.
    SetWorkers(usize),
    /// Report how many workers are running.
    Workers,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Accept(_) => "accept",
            Command::Refund { .. } => "refund",
            Command::Give { .. } => "give",
            Command::Return { .. } => "return",
            Command::Orders { .. } => "orders",
            Command::Refunds { .. } => "refunds",
        }
    }

    /// Order ids the command targets, space separated; empty for the listings.
    pub fn order_ids(&self) -> String {
        match self {
            Command::Accept(request) => request.order_id.to_string(),
            Command::Refund { order_id, .. } | Command::Return { order_id } => order_id.to_string(),
            Command::Give { order_ids } => join_ids(order_ids),
            Command::Orders { .. } | Command::Refunds { .. } => String::new(),
        }
    }

    /// `"<name> <order ids>"`, used to tag the command's outcome.
    pub fn label(&self) -> String {
        format!("{} {}", self.name(), self.order_ids())
    }

    /// Runs the command and renders a one-line summary of what it did.
    pub async fn execute(self, service: &OrderService) -> Result<String> {
        match self {
            Command::Accept(request) => {
                let order = service.accept_order(request).await?;
                Ok(format!(
                    "accepted: cost {} package {}",
                    order.cost,
                    order.package_label()
                ))
            }
            Command::Refund { user_id, order_id } => {
                service.accept_refund(user_id, order_id).await?;
                Ok("returned".to_string())
            }
            Command::Give { order_ids } => {
                let given = service.give(&order_ids).await?;
                Ok(format!("issued to client: {}", join_ids(&given)))
            }
            Command::Return { order_id } => {
                service.return_order(order_id).await?;
                Ok("issued to courier".to_string())
            }
            Command::Orders {
                user_id,
                first_order_id,
                limit,
            } => {
                let orders = service.get_orders(user_id, first_order_id, limit).await?;
                Ok(render_views(&orders))
            }
            Command::Refunds { page, per_page } => {
                let refunds = service.get_refunds(page, per_page).await?;
                Ok(render_views(&refunds))
            }
        }
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_views(views: &[OrderView]) -> String {
    views
        .iter()
        .map(|view| {
            format!(
                "{}:{}:{}:{}:{}",
                view.order_id,
                view.user_id,
                view.order.package_label(),
                view.order.cost,
                format_date(view.order.expiration_date)
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}
