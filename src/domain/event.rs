use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Accepted,
    IssuedToClient,
    IssuedToCourier,
    Returned,
}

/// Notification handed to the event sink after a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub order_ids: Vec<u64>,
    /// Set when the operation failed inside the engine.
    pub error: Option<String>,
}

impl Event {
    pub fn new(
        order_ids: Vec<u64>,
        kind: EventKind,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            timestamp,
            order_ids,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_shape() {
        let event = Event::new(vec![31, 32], EventKind::IssuedToClient, None, Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "issued_to_client");
        assert_eq!(json["order_ids"], serde_json::json!([31, 32]));
        assert!(json["error"].is_null());
    }
}
