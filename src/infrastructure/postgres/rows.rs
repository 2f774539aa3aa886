use crate::domain::order::{Order, OrderStatus, OrderView, Status};
use crate::domain::packaging::PackageKind;
use crate::error::{OrderError, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// `user_id, expiration_date, package_type, weight, cost, use_tape, status, updated_at`
pub type HistoryRow = (i64, NaiveDate, String, i64, i64, bool, String, DateTime<Utc>);

/// `user_id, order_id, expiration_date, package_type, weight, cost, use_tape`
pub type ViewRow = (i64, i64, NaiveDate, String, i64, i64, bool);

/// `expiration_date, package_type, weight, cost, use_tape`
pub type OrderRow = (NaiveDate, String, i64, i64, bool);

pub fn to_db(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| OrderError::WrongInput(format!("{value} is out of range")))
}

pub fn from_db(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| OrderError::internal(format!("negative value {value} in database")))
}

pub fn order_from_row((expiration_date, package, weight, cost, use_tape): OrderRow) -> Result<Order> {
    Ok(Order {
        expiration_date,
        package: package.parse::<PackageKind>()?,
        weight: from_db(weight)?,
        cost: from_db(cost)?,
        use_tape,
    })
}

pub fn status_from_row(row: HistoryRow) -> Result<OrderStatus> {
    let (user_id, expiration_date, package, weight, cost, use_tape, status, updated_at) = row;
    Ok(OrderStatus {
        order: order_from_row((expiration_date, package, weight, cost, use_tape))?,
        status: status.parse::<Status>()?,
        user_id: from_db(user_id)?,
        updated_at,
    })
}

pub fn view_from_row(row: ViewRow) -> Result<OrderView> {
    let (user_id, order_id, expiration_date, package, weight, cost, use_tape) = row;
    Ok(OrderView::new(
        from_db(user_id)?,
        from_db(order_id)?,
        order_from_row((expiration_date, package, weight, cost, use_tape))?,
    ))
}

pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_conversions() {
        assert_eq!(to_db(42).unwrap(), 42);
        assert!(matches!(to_db(u64::MAX), Err(OrderError::WrongInput(_))));
        assert!(from_db(-1).is_err());
    }

    #[test]
    fn test_status_from_row() {
        let at = Utc::now();
        let row: HistoryRow = (
            432,
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            "package".to_string(),
            402,
            1408,
            true,
            "issued_to_client".to_string(),
            at,
        );
        let record = status_from_row(row).unwrap();
        assert_eq!(record.user_id, 432);
        assert_eq!(record.status, Status::IssuedToClient);
        assert_eq!(record.order.package, PackageKind::Package);
        assert_eq!(record.order.cost, 1408);
        assert_eq!(record.updated_at, at);
    }
}
