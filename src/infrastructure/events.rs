use crate::domain::event::Event;
use crate::domain::ports::EventSink;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Writes each event to the log as a JSON document.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn publish(&self, event: Event) -> Result<()> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(target: "pickup_point::events", %payload, "Order event");
        Ok(())
    }
}

/// Forwards events to an in-process receiver.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<Event>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn publish(&self, event: Event) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| OrderError::internal("event receiver dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::EventKind;
    use chrono::Utc;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut receiver) = ChannelEventSink::new();
        let at = Utc::now();
        sink.publish(Event::new(vec![1], EventKind::Accepted, None, at))
            .await
            .unwrap();
        sink.publish(Event::new(vec![2, 3], EventKind::IssuedToClient, None, at))
            .await
            .unwrap();

        assert_eq!(receiver.recv().await.unwrap().order_ids, vec![1]);
        assert_eq!(receiver.recv().await.unwrap().order_ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_channel_sink_fails_without_receiver() {
        let (sink, receiver) = ChannelEventSink::new();
        drop(receiver);
        let event = Event::new(vec![1], EventKind::Returned, None, Utc::now());
        assert!(matches!(
            sink.publish(event).await,
            Err(OrderError::InternalError(_))
        ));
    }

    #[tokio::test]
    async fn test_log_sink_accepts_events() {
        let event = Event::new(vec![7], EventKind::Accepted, Some("boom".into()), Utc::now());
        LogEventSink.publish(event).await.unwrap();
    }
}
