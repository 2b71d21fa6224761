//! Event emission pipeline.
//!
//! The funnel builds enriched envelopes ([`EventRecord`]) and appends them to
//! an insertion-ordered channel. An external collector owns the receiving
//! end; nothing here waits on or confirms delivery.

pub mod channel;
pub mod emitter;
pub mod model;

pub use channel::{event_channel, EventReceiver, EventSender};
pub use emitter::EventEmitter;
pub use model::{AttributionContext, EventName, EventRecord, QUALIFICATION_VERSION};
