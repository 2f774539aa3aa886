use crate::application::dispatcher::TaskOutcome;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OutcomeRecord<'a> {
    op: &'a str,
    orders: &'a str,
    outcome: &'a str,
    detail: String,
}

/// Writes one CSV line per finished command: `op,orders,outcome,detail`.
///
/// `outcome` is `ok`, or the status code of the failure class (`NOT_FOUND`, `INVALID_ARGUMENT`, ...).
pub struct ResultWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, outcome: &TaskOutcome) -> Result<()> {
        let (op, orders) = outcome
            .label
            .split_once(' ')
            .unwrap_or((outcome.label.as_str(), ""));
        let (status, detail) = match &outcome.result {
            Ok(detail) => ("ok", detail.clone()),
            Err(e) => (e.kind().grpc_code(), e.to_string()),
        };

        self.writer.serialize(OutcomeRecord {
            op,
            orders,
            outcome: status,
            detail,
        })?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrderError;

    #[test]
    fn test_writes_header_and_rows() {
        let mut buffer = Vec::new();
        {
            let mut writer = ResultWriter::new(&mut buffer);
            writer
                .write(&TaskOutcome {
                    label: "give 1 2".to_string(),
                    result: Ok("issued to client: 1 2".to_string()),
                })
                .unwrap();
            writer
                .write(&TaskOutcome {
                    label: "return 7".to_string(),
                    result: Err(OrderError::NotFound("order 7 not found".to_string())),
                })
                .unwrap();
        }

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "op,orders,outcome,detail");
        assert_eq!(lines[1], "give,1 2,ok,issued to client: 1 2");
        assert_eq!(lines[2], "return,7,NOT_FOUND,not found: order 7 not found");
    }
}
