//! Abandonment detection on page-lifecycle signals.
//!
//! Both "tab hidden" and "page hide" may arrive for the same exit; the
//! detector emits `form_abandon` at most once per funnel.

use serde_json::json;
use tracing::{debug, info};

use crate::events::{EventEmitter, EventName};
use crate::funnel::model::{ChoiceField, FormAnswers, StepIndex, TOTAL_STEPS};

/// Page-lifecycle signals observed by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    VisibilityHidden,
    VisibilityVisible,
    PageHide,
}

impl LifecycleSignal {
    /// Whether the signal means the session may be ending.
    pub fn ends_session(self) -> bool {
        matches!(self, Self::VisibilityHidden | Self::PageHide)
    }
}

/// Wizard facts the detector needs at the moment of the signal.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot<'a> {
    pub started: bool,
    pub submitted: bool,
    pub last_step: StepIndex,
    pub start_time_ms: Option<i64>,
    pub answers: &'a FormAnswers,
}

/// One-shot `form_abandon` guard.
#[derive(Debug, Default)]
pub struct AbandonmentDetector {
    fired: bool,
}

impl AbandonmentDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Handle a lifecycle signal. Returns `true` if `form_abandon` was emitted.
    pub fn on_signal(
        &mut self,
        signal: LifecycleSignal,
        progress: ProgressSnapshot<'_>,
        now_ms: i64,
        emitter: &EventEmitter,
    ) -> bool {
        if !signal.ends_session() {
            return false;
        }
        if self.fired || !progress.started || progress.submitted {
            debug!(
                signal = ?signal,
                fired = self.fired,
                started = progress.started,
                submitted = progress.submitted,
                "No abandonment to report"
            );
            return false;
        }
        self.fired = true;

        let elapsed_seconds = progress
            .start_time_ms
            .map(|start| ((now_ms - start) as f64 / 1000.0).round() as i64)
            .unwrap_or(0);

        let answer = |field| progress.answers.choice(field);
        emitter.emit(
            EventName::FormAbandon,
            json!({
                "last_step": progress.last_step.get(),
                "total_steps": TOTAL_STEPS,
                "elapsed_time_seconds": elapsed_seconds,
                "primary_goal": answer(ChoiceField::PrimaryGoal),
                "timeline": answer(ChoiceField::Timeline),
                "priority": answer(ChoiceField::Priority),
                "investment_range": answer(ChoiceField::InvestmentRange),
            }),
        );
        info!(last_step = %progress.last_step, elapsed_seconds, "Form abandon fired");
        true
    }
}
