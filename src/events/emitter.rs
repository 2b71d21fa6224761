//! Envelope construction and emission.

use serde_json::{Map, Value};
use tracing::debug;

use crate::identity::SessionIdentity;

use super::channel::EventSender;
use super::model::{AttributionContext, EventName, EventRecord};

/// Builds envelopes from the session context and appends them to the channel.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    identity: SessionIdentity,
    attribution: AttributionContext,
    tx: EventSender,
}

impl EventEmitter {
    pub fn new(identity: SessionIdentity, attribution: AttributionContext, tx: EventSender) -> Self {
        Self {
            identity,
            attribution,
            tx,
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn attribution(&self) -> &AttributionContext {
        &self.attribution
    }

    /// Emit an event carrying `payload`. Non-object payloads are treated as empty.
    pub fn emit(&self, event: EventName, payload: Value) {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let record = self.envelope(event, payload);
        debug!(event = %event, "Event pushed");
        self.tx.send(record);
    }

    /// Emit an event with no payload.
    pub fn emit_bare(&self, event: EventName) {
        self.emit(event, Value::Null);
    }

    fn envelope(&self, event: EventName, payload: Map<String, Value>) -> EventRecord {
        EventRecord {
            event,
            session_id: self.identity.session_id.clone(),
            lead_id: self.identity.lead_id.clone(),
            attribution: self.attribution.clone(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use serde_json::json;

    fn emitter() -> (EventEmitter, crate::events::EventReceiver) {
        let (tx, rx) = event_channel();
        let identity = SessionIdentity {
            session_id: "sess".into(),
            lead_id: "lead".into(),
        };
        let attribution = AttributionContext::from_query("utm_source=meta", "v1");
        (EventEmitter::new(identity, attribution, tx), rx)
    }

    #[test]
    fn envelope_carries_identity_and_attribution() {
        let (emitter, mut rx) = emitter();
        emitter.emit(EventName::CtaClick, json!({ "cta_id": "hero" }));

        let record = rx.try_recv().unwrap();
        assert_eq!(record.event, EventName::CtaClick);
        assert_eq!(record.session_id, "sess");
        assert_eq!(record.lead_id, "lead");
        assert_eq!(record.attribution.utm_source, "meta");
        assert_eq!(record.get("cta_id"), Some(&json!("hero")));
    }

    #[test]
    fn bare_event_has_empty_payload() {
        let (emitter, mut rx) = emitter();
        emitter.emit_bare(EventName::PageView);
        emitter.emit(EventName::FormStart, json!("not an object"));

        let records = rx.drain();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.payload.is_empty()));
    }
}
