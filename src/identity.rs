//! Session and lead identity.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{keys, KeyValueStore};

/// Prefix of the short, human-shareable submission id.
const SHORT_ID_PREFIX: &str = "CT-";
const SHORT_ID_LEN: usize = 6;
const SHORT_ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Identifiers attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Scoped to one browsing session (ephemeral store).
    pub session_id: String,
    /// Scoped to the device/profile (durable store).
    pub lead_id: String,
}

impl SessionIdentity {
    /// Load both identifiers, generating and storing any that are missing.
    ///
    /// An existing value is never regenerated.
    pub fn load_or_create(
        ephemeral: &dyn KeyValueStore,
        durable: &dyn KeyValueStore,
    ) -> Result<Self, StoreError> {
        let session_id = get_or_generate(ephemeral, keys::SESSION_ID)?;
        let lead_id = get_or_generate(durable, keys::LEAD_ID)?;
        debug!(session_id = %session_id, lead_id = %lead_id, "Identity loaded");
        Ok(Self {
            session_id,
            lead_id,
        })
    }

    /// Like [`load_or_create`](Self::load_or_create), but a store failure
    /// yields a fresh id that lives only for this load.
    pub fn load_or_generate(ephemeral: &dyn KeyValueStore, durable: &dyn KeyValueStore) -> Self {
        let identity = Self {
            session_id: get_or_fallback(ephemeral, keys::SESSION_ID),
            lead_id: get_or_fallback(durable, keys::LEAD_ID),
        };
        debug!(session_id = %identity.session_id, lead_id = %identity.lead_id, "Identity loaded");
        identity
    }
}

fn get_or_fallback(store: &dyn KeyValueStore, key: &str) -> String {
    get_or_generate(store, key).unwrap_or_else(|e| {
        warn!(key, error = %e, "Identifier not persisted, using a transient one");
        Uuid::new_v4().to_string()
    })
}

fn get_or_generate(store: &dyn KeyValueStore, key: &str) -> Result<String, StoreError> {
    if let Some(existing) = store.get(key)?.filter(|v| !v.is_empty()) {
        return Ok(existing);
    }
    let id = Uuid::new_v4().to_string();
    store.set(key, &id)?;
    debug!(key, id = %id, "Generated new identifier");
    Ok(id)
}

/// Generate a short submission id such as `CT-4K9ZQ1`.
pub fn short_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SHORT_ID_LEN)
        .map(|_| char::from(SHORT_ID_ALPHABET[rng.gen_range(0..SHORT_ID_ALPHABET.len())]))
        .collect();
    format!("{SHORT_ID_PREFIX}{suffix}")
}
