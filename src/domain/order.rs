use super::packaging::{PackageKind, Packaging, package_label};
use crate::error::{OrderError, Result};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format used on the wire, e.g. `31-12-2025`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Window after issue during which the client may still refund.
pub const REFUND_WINDOW: TimeDelta = TimeDelta::days(2);
/// Grace period after expiration before an unclaimed order may go back to the courier.
pub const RETURN_GRACE: TimeDelta = TimeDelta::hours(24);

/// A parcel as it was accepted. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub expiration_date: NaiveDate,
    pub package: PackageKind,
    pub weight: u64,
    pub cost: u64,
    pub use_tape: bool,
}

impl Order {
    /// Prices the parcel with its packaging and freezes the result.
    pub fn new(
        expiration_date: NaiveDate,
        weight: u64,
        base_cost: u64,
        packaging: Packaging,
    ) -> Result<Self> {
        let cost = packaging.cost(weight, base_cost)?;
        Ok(Self {
            expiration_date,
            package: packaging.kind(),
            weight,
            cost,
            use_tape: packaging.is_taped(),
        })
    }

    pub fn package_label(&self) -> String {
        package_label(self.package, self.use_tape)
    }

    /// First instant of the expiration day, in UTC.
    pub fn expires_at(&self) -> DateTime<Utc> {
        start_of_day(self.expiration_date)
    }
}

/// Lifecycle of an order.
///
/// `Accepted` → `IssuedToClient` | `IssuedToCourier`; `IssuedToClient` → `Returned`;
/// `Returned` → `IssuedToCourier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Accepted,
    IssuedToClient,
    IssuedToCourier,
    Returned,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Accepted => "accepted",
            Status::IssuedToClient => "issued_to_client",
            Status::IssuedToCourier => "issued_to_courier",
            Status::Returned => "returned",
        }
    }

    pub fn is_issued(self) -> bool {
        matches!(self, Status::IssuedToClient | Status::IssuedToCourier)
    }

    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Accepted, Status::IssuedToClient)
                | (Status::Accepted, Status::IssuedToCourier)
                | (Status::IssuedToClient, Status::Returned)
                | (Status::Returned, Status::IssuedToCourier)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('_', " "))
    }
}

impl FromStr for Status {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accepted" => Ok(Status::Accepted),
            "issued_to_client" => Ok(Status::IssuedToClient),
            "issued_to_courier" => Ok(Status::IssuedToCourier),
            "returned" => Ok(Status::Returned),
            other => Err(OrderError::internal(format!("unknown order status {other}"))),
        }
    }
}

/// The authoritative lifecycle record of one order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order: Order,
    pub status: Status,
    pub user_id: u64,
    pub updated_at: DateTime<Utc>,
}

/// Projection stored in the paginated per-user and refund views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub order: Order,
    pub user_id: u64,
    pub order_id: u64,
    pub exists: bool,
}

impl OrderView {
    pub fn new(user_id: u64, order_id: u64, order: Order) -> Self {
        Self {
            order,
            user_id,
            order_id,
            exists: true,
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| OrderError::WrongInput(format!("bad date {value:?}: {e}")))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
