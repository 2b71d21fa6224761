//! Single-producer, single-consumer event channel.

use tokio::sync::mpsc;
use tracing::warn;

use super::model::EventRecord;

/// Create an unbounded, insertion-ordered event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

/// Producing end, owned by the funnel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<EventRecord>,
}

impl EventSender {
    /// Append a record. Returns `false` if the collector has gone away; the
    /// record is dropped in that case.
    pub fn send(&self, record: EventRecord) -> bool {
        match self.tx.send(record) {
            Ok(()) => true,
            Err(mpsc::error::SendError(record)) => {
                warn!(event = %record.event, "Event collector gone, event dropped");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consuming end, owned by the external collector.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<EventRecord>,
}

impl EventReceiver {
    /// Wait for the next record. `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<EventRecord> {
        self.rx.recv().await
    }

    /// Take the next record without waiting.
    pub fn try_recv(&mut self) -> Option<EventRecord> {
        self.rx.try_recv().ok()
    }

    /// Take every record queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::model::{AttributionContext, EventName};

    fn record(event: EventName) -> EventRecord {
        EventRecord {
            event,
            session_id: "s".into(),
            lead_id: "l".into(),
            attribution: AttributionContext::default(),
            payload: Default::default(),
        }
    }

    #[test]
    fn drain_preserves_order() {
        let (tx, mut rx) = event_channel();
        assert!(tx.send(record(EventName::PageView)));
        assert!(tx.send(record(EventName::FormStep)));

        let names: Vec<_> = rx.drain().into_iter().map(|r| r.event).collect();
        assert_eq!(names, [EventName::PageView, EventName::FormStep]);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn send_after_collector_dropped() {
        let (tx, rx) = event_channel();
        drop(rx);
        assert!(tx.is_closed());
        assert!(!tx.send(record(EventName::PageView)));
    }

    #[tokio::test]
    async fn recv_ends_when_sender_dropped() {
        let (tx, mut rx) = event_channel();
        tx.send(record(EventName::CtaClick));
        drop(tx);

        assert_eq!(rx.recv().await.map(|r| r.event), Some(EventName::CtaClick));
        assert!(rx.recv().await.is_none());
    }
}
