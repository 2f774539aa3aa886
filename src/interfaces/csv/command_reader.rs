use crate::application::command::{Command, Request};
use crate::application::service::AcceptOrder;
use crate::domain::order::parse_date;
use crate::domain::packaging::PackageKind;
use crate::error::{OrderError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Accept,
    Refund,
    Give,
    Return,
    Orders,
    Refunds,
    Workers,
}

/// One raw row of a command file. Which columns are required depends on `op`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub op: Op,
    pub user: Option<u64>,
    pub orders: Option<String>,
    pub expiration: Option<String>,
    pub package: Option<String>,
    pub weight: Option<u64>,
    pub cost: Option<u64>,
    pub wrap: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Pool size for `workers`; without it the row asks for the current size.
    pub workers: Option<usize>,
}

fn required<T>(value: Option<T>, field: &str, op: Op) -> Result<T> {
    value.ok_or_else(|| OrderError::WrongInput(format!("{op:?} needs the {field} column")))
}

fn parse_ids(orders: &str) -> Result<Vec<u64>> {
    orders
        .split_whitespace()
        .map(|id| {
            id.parse::<u64>()
                .map_err(|e| OrderError::WrongInput(format!("bad order id {id:?}: {e}")))
        })
        .collect()
}

fn single_id(orders: Option<String>, op: Op) -> Result<u64> {
    let ids = parse_ids(&required(orders, "orders", op)?)?;
    match ids.as_slice() {
        [id] => Ok(*id),
        _ => Err(OrderError::WrongInput(format!(
            "{op:?} takes exactly one order id"
        ))),
    }
}

impl TryFrom<CommandRecord> for Request {
    type Error = OrderError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let op = record.op;
        let command = match op {
            Op::Workers => {
                return Ok(match record.workers {
                    Some(count) => Request::SetWorkers(count),
                    None => Request::Workers,
                });
            }
            Op::Accept => Command::Accept(AcceptOrder {
                user_id: required(record.user, "user", op)?,
                order_id: single_id(record.orders, op)?,
                expiration_date: parse_date(&required(record.expiration, "expiration", op)?)?,
                package: record
                    .package
                    .as_deref()
                    .unwrap_or_default()
                    .parse::<PackageKind>()?,
                wrap: record.wrap.unwrap_or(false),
                weight: required(record.weight, "weight", op)?,
                base_cost: required(record.cost, "cost", op)?,
            }),
            Op::Refund => Command::Refund {
                user_id: required(record.user, "user", op)?,
                order_id: single_id(record.orders, op)?,
            },
            Op::Give => Command::Give {
                order_ids: parse_ids(&required(record.orders, "orders", op)?)?,
            },
            Op::Return => Command::Return {
                order_id: single_id(record.orders, op)?,
            },
            Op::Orders => Command::Orders {
                user_id: required(record.user, "user", op)?,
                first_order_id: match record.orders {
                    Some(orders) if !orders.trim().is_empty() => {
                        single_id(Some(orders), op)?
                    }
                    _ => 0,
                },
                limit: record.limit.unwrap_or(0),
            },
            Op::Refunds => Command::Refunds {
                page: required(record.page, "page", op)?,
                per_page: required(record.limit, "limit", op)?,
            },
        };
        Ok(Request::Run(command))
    }
}

/// Reads commands from a CSV source.
///
/// Whitespace is trimmed and rows may omit trailing columns they don't use.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily parses rows; a bad row yields an error and reading carries on.
    pub fn commands(self) -> impl Iterator<Item = Result<Request>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|result| result.map_err(OrderError::from).and_then(Request::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str =
        "op, user, orders, expiration, package, weight, cost, wrap, page, limit, workers";

    fn read(rows: &str) -> Vec<Result<Command>> {
        read_requests(rows)
            .into_iter()
            .map(|request| match request? {
                Request::Run(command) => Ok(command),
                other => panic!("unexpected request: {other:?}"),
            })
            .collect()
    }

    fn read_requests(rows: &str) -> Vec<Result<Request>> {
        let data = format!("{HEADER}\n{rows}");
        CommandReader::new(data.as_bytes()).commands().collect()
    }

    #[test]
    fn test_reads_every_kind_of_command() {
        let results = read(
            "accept, 432, 31, 01-02-2030, package, 402, 1402, true,,\n\
             give,, 31 30 31\n\
             refund, 432, 31\n\
             return,, 31\n\
             orders, 432,,,,,,,, 5\n\
             refunds,,,,,,,, 2, 10",
        );
        let commands: Vec<Command> = results.into_iter().map(|r| r.unwrap()).collect();

        assert_eq!(
            commands[0],
            Command::Accept(AcceptOrder {
                user_id: 432,
                order_id: 31,
                expiration_date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
                package: PackageKind::Package,
                wrap: true,
                weight: 402,
                base_cost: 1402,
            })
        );
        assert_eq!(
            commands[1],
            Command::Give {
                order_ids: vec![31, 30, 31]
            }
        );
        assert_eq!(
            commands[2],
            Command::Refund {
                user_id: 432,
                order_id: 31
            }
        );
        assert_eq!(commands[3], Command::Return { order_id: 31 });
        assert_eq!(
            commands[4],
            Command::Orders {
                user_id: 432,
                first_order_id: 0,
                limit: 5
            }
        );
        assert_eq!(
            commands[5],
            Command::Refunds {
                page: 2,
                per_page: 10
            }
        );
    }

    #[test]
    fn test_bad_rows_do_not_stop_the_stream() {
        let results = read(
            "fly, 1, 1\n\
             accept, 1, 1, 2030-02-01, box, 10, 10\n\
             accept, 1, 2, 01-02-2030, crate, 10, 10\n\
             refund,, 3\n\
             return,, 4",
        );
        assert_eq!(results.len(), 5);
        assert!(matches!(results[0], Err(OrderError::CsvError(_))));
        assert!(matches!(results[1], Err(OrderError::WrongInput(_))));
        assert!(matches!(results[2], Err(OrderError::WrongInput(_))));
        assert!(matches!(results[3], Err(OrderError::WrongInput(_))));
        assert_eq!(*results[4].as_ref().unwrap(), Command::Return { order_id: 4 });
    }

    #[test]
    fn test_reads_pool_requests() {
        let requests = read_requests(
            "workers,,,,,,,,,, 8\n\
             workers\n\
             workers,,,,,,,,,, many",
        );
        assert_eq!(*requests[0].as_ref().unwrap(), Request::SetWorkers(8));
        assert_eq!(*requests[1].as_ref().unwrap(), Request::Workers);
        assert!(matches!(requests[2], Err(OrderError::CsvError(_))));
    }

    #[test]
    fn test_workers_column_is_optional_in_the_header() {
        let data = "op, user, orders\nreturn,, 4\nworkers";
        let requests: Vec<Request> = CommandReader::new(data.as_bytes())
            .commands()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            requests,
            vec![
                Request::Run(Command::Return { order_id: 4 }),
                Request::Workers
            ]
        );
    }

    #[test]
    fn test_default_package_when_column_is_empty() {
        let results = read("accept, 1, 9, 01-02-2030,, 10, 10");
        match results[0].as_ref().unwrap() {
            Command::Accept(request) => {
                assert_eq!(request.package, PackageKind::Default);
                assert!(!request.wrap);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
