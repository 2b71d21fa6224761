//! Persistence layer — key-value stores for identity and wizard progress.
//!
//! Two durability tiers share the [`KeyValueStore`] trait: an ephemeral
//! per-session store (holds `session_id`) and a durable store (holds the lead
//! id, in-progress answers, navigation position, and the submission receipt).

pub mod libsql_backend;
pub mod memory;
pub mod progress;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use progress::ProgressStore;
pub use traits::KeyValueStore;

/// Exact storage keys. Restoration across reloads depends on these names.
pub mod keys {
    /// Ephemeral: per-session identifier.
    pub const SESSION_ID: &str = "session_id";
    /// Durable: per-device lead identifier.
    pub const LEAD_ID: &str = "lead_id";
    /// Durable: serialized `FormAnswers`.
    pub const FORM_DATA: &str = "form_data";
    /// Durable: last entered step number.
    pub const CURRENT_STEP: &str = "current_step";
    /// Durable: `"true"` once `form_start` has fired.
    pub const FORM_STARTED: &str = "form_started";
    /// Durable: epoch millis when the form was started.
    pub const FORM_START_TIME: &str = "form_start_time";
    /// Durable: serialized `SubmissionReceipt`.
    pub const LAST_SUBMISSION: &str = "lead_last_submission";
}
