//! Typed access to wizard progress in the durable store.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::funnel::model::{FormAnswers, StepIndex, SubmissionReceipt};

use super::keys;
use super::traits::KeyValueStore;

/// Wizard progress, start marker, and submission receipt over exact keys.
#[derive(Clone)]
pub struct ProgressStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The durable store backing this view.
    pub fn inner(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Saved answers, or empty answers when nothing was saved.
    pub fn load_answers(&self) -> Result<FormAnswers, StoreError> {
        match self.store.get(keys::FORM_DATA)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                key: keys::FORM_DATA.to_string(),
                message: e.to_string(),
            }),
            None => Ok(FormAnswers::default()),
        }
    }

    /// The saved step, if present and within range. Junk is ignored.
    pub fn load_step(&self) -> Result<Option<StepIndex>, StoreError> {
        let Some(raw) = self.store.get(keys::CURRENT_STEP)? else {
            return Ok(None);
        };
        let step = raw.trim().parse::<u8>().ok().and_then(StepIndex::new);
        if step.is_none() {
            warn!(raw = %raw, "Ignoring out-of-range saved step");
        }
        Ok(step)
    }

    /// Record the entered step and the answers at that moment.
    pub fn save_progress(&self, step: StepIndex, answers: &FormAnswers) -> Result<(), StoreError> {
        self.store
            .set(keys::FORM_DATA, &serde_json::to_string(answers)?)?;
        self.store.set(keys::CURRENT_STEP, &step.to_string())?;
        debug!(step = %step, "Progress saved");
        Ok(())
    }

    pub fn form_started(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(keys::FORM_STARTED)?.as_deref() == Some("true"))
    }

    /// Epoch millis recorded when the form was started.
    pub fn form_start_time(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .store
            .get(keys::FORM_START_TIME)?
            .and_then(|raw| raw.trim().parse().ok()))
    }

    pub fn mark_started(&self, start_time_ms: i64) -> Result<(), StoreError> {
        self.store.set(keys::FORM_STARTED, "true")?;
        self.store
            .set(keys::FORM_START_TIME, &start_time_ms.to_string())?;
        Ok(())
    }

    pub fn save_receipt(&self, receipt: &SubmissionReceipt) -> Result<(), StoreError> {
        self.store
            .set(keys::LAST_SUBMISSION, &serde_json::to_string(receipt)?)
    }

    pub fn load_receipt(&self) -> Result<Option<SubmissionReceipt>, StoreError> {
        self.store
            .get(keys::LAST_SUBMISSION)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                    key: keys::LAST_SUBMISSION.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// Drop in-progress state after a submission. Identity and the receipt stay.
    pub fn clear_progress(&self) -> Result<(), StoreError> {
        self.store.remove(keys::FORM_DATA)?;
        self.store.remove(keys::CURRENT_STEP)?;
        self.store.remove(keys::FORM_STARTED)?;
        debug!("Cleared form progress");
        Ok(())
    }
}
