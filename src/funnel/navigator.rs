//! Step navigator — the wizard state machine.
//!
//! Linear steps `1..=N` plus two terminal result states reachable only from
//! the last step. Every entry into a numbered step saves progress and then
//! emits `form_step`.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::error::{NavigationError, StoreError};
use crate::events::{EventEmitter, EventName};
use crate::store::ProgressStore;
use crate::tiering::{TierDecision, TieringPolicy};

use super::model::{FormAnswers, StepIndex};
use super::presenter::{ButtonVisibility, Presenter};
use super::validation::{validate_step, ValidationBlocked};

/// Where the wizard is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Step(StepIndex),
    Qualified,
    NotQualified,
}

impl WizardState {
    /// Whether the wizard has finished. No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Qualified | Self::NotQualified)
    }
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step(step) => write!(f, "step {step}"),
            Self::Qualified => write!(f, "qualified"),
            Self::NotQualified => write!(f, "not_qualified"),
        }
    }
}

/// Requested transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Next,
    Prev,
    Submit,
}

impl std::fmt::Display for NavAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Next => write!(f, "next"),
            Self::Prev => write!(f, "prev"),
            Self::Submit => write!(f, "submit"),
        }
    }
}

/// Wizard state machine over the durable progress store.
pub struct StepNavigator {
    state: WizardState,
    answers: FormAnswers,
    progress: ProgressStore,
    form_started: bool,
    form_start_time: Option<i64>,
}

impl StepNavigator {
    /// Restore from the durable store and enter the saved step (or step 1).
    ///
    /// Steps before a saved position are not re-validated. Storage problems
    /// are logged and treated as a fresh start.
    pub fn restore(
        progress: ProgressStore,
        presenter: &mut dyn Presenter,
        emitter: &EventEmitter,
    ) -> Self {
        let answers = progress.load_answers().unwrap_or_else(|e| {
            warn!(error = %e, "Discarding unreadable saved answers");
            FormAnswers::default()
        });
        let form_started = progress.form_started().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read form_started");
            false
        });
        let form_start_time = if form_started {
            Some(
                progress
                    .form_start_time()
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| Utc::now().timestamp_millis()),
            )
        } else {
            None
        };
        let saved_step = progress.load_step().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read current_step");
            None
        });

        if !answers.is_empty() {
            info!(saved_step = ?saved_step.map(StepIndex::get), "Restored form data");
            presenter.restore_answers(&answers);
        }

        let mut navigator = Self {
            state: WizardState::Step(StepIndex::FIRST),
            answers,
            progress,
            form_started,
            form_start_time,
        };

        let target = saved_step.unwrap_or(StepIndex::FIRST);
        let answers = navigator.staged(presenter);
        if let Err(e) = navigator.enter_step(target, answers.clone(), false, presenter, emitter) {
            error!(step = %target, error = %e, "Could not restore step");
            if target != StepIndex::FIRST {
                if let Err(e) =
                    navigator.enter_step(StepIndex::FIRST, answers, false, presenter, emitter)
                {
                    error!(error = %e, "Could not enter first step");
                }
            }
        }

        navigator
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Active numbered step, `None` once a result is shown.
    pub fn current_step(&self) -> Option<StepIndex> {
        match self.state {
            WizardState::Step(step) => Some(step),
            _ => None,
        }
    }

    /// Last numbered step the respondent was on.
    pub fn last_step(&self) -> StepIndex {
        self.current_step().unwrap_or(StepIndex::LAST)
    }

    /// In-memory answers as of the last capture.
    pub fn answers(&self) -> &FormAnswers {
        &self.answers
    }

    pub fn form_started(&self) -> bool {
        self.form_started
    }

    pub fn form_start_time(&self) -> Option<i64> {
        self.form_start_time
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn is_submitted(&self) -> bool {
        self.state.is_terminal()
    }

    /// Advance one step if the current step validates.
    ///
    /// The first successful advance also fires `form_start` (just before the
    /// step event), whichever step it happens on. A blocked advance leaves
    /// the in-memory answers untouched.
    pub fn next(
        &mut self,
        presenter: &mut dyn Presenter,
        emitter: &EventEmitter,
    ) -> Result<StepIndex, NavigationError> {
        let current = self.require_step(NavAction::Next)?;
        let target = current
            .next()
            .ok_or_else(|| self.invalid(NavAction::Next))?;

        let answers = self.staged(presenter);
        check(current, &answers, presenter, emitter)?;

        let starting = !self.form_started;
        self.enter_step(target, answers, starting, presenter, emitter)?;
        Ok(target)
    }

    /// Go back one step. Never validated.
    pub fn prev(
        &mut self,
        presenter: &mut dyn Presenter,
        emitter: &EventEmitter,
    ) -> Result<StepIndex, NavigationError> {
        let current = self.require_step(NavAction::Prev)?;
        let target = current
            .prev()
            .ok_or_else(|| self.invalid(NavAction::Prev))?;

        let answers = self.staged(presenter);
        self.enter_step(target, answers, false, presenter, emitter)?;
        Ok(target)
    }

    /// Submit from the last step: validate, save, classify, and move to
    /// the matching result state.
    pub fn submit(
        &mut self,
        policy: TieringPolicy,
        presenter: &mut dyn Presenter,
        emitter: &EventEmitter,
    ) -> Result<TierDecision, NavigationError> {
        let current = self.require_step(NavAction::Submit)?;
        if !current.is_last() {
            return Err(self.invalid(NavAction::Submit));
        }

        let answers = self.staged(presenter);
        check(current, &answers, presenter, emitter)?;
        self.progress.save_progress(current, &answers)?;
        self.answers = answers;

        let decision = policy.evaluate(&self.answers);
        self.state = if decision.is_qualified() {
            WizardState::Qualified
        } else {
            WizardState::NotQualified
        };
        info!(tier = %decision.tier, rule = decision.rule, state = %self.state, "Form submitted");
        Ok(decision)
    }

    /// Remove in-progress state after a submission.
    pub fn clear_progress(&self) -> Result<(), StoreError> {
        self.progress.clear_progress()
    }

    /// Committed answers merged with the presentation's current values.
    fn staged(&self, presenter: &dyn Presenter) -> FormAnswers {
        let mut answers = self.answers.clone();
        answers.capture(presenter);
        answers
    }

    /// Save `answers` at `step`, activate it, commit, then emit.
    ///
    /// Nothing is committed or emitted unless every store write and the
    /// activation succeed. With `starting`, the start marker is written and
    /// `form_start` goes out ahead of `form_step`.
    fn enter_step(
        &mut self,
        step: StepIndex,
        answers: FormAnswers,
        starting: bool,
        presenter: &mut dyn Presenter,
        emitter: &EventEmitter,
    ) -> Result<(), NavigationError> {
        if !presenter.has_step(step) {
            error!(step = %step, "Target step not found");
            return Err(NavigationError::MissingTargetStep(step));
        }

        self.progress.save_progress(step, &answers)?;
        let started_at = if starting {
            let now = Utc::now().timestamp_millis();
            self.progress.mark_started(now)?;
            Some(now)
        } else {
            None
        };

        if let Err(e) = presenter.activate_step(step) {
            error!(step = %step, error = %e, "Presentation refused step");
            return Err(NavigationError::MissingTargetStep(step));
        }
        self.answers = answers;
        self.state = WizardState::Step(step);

        let percent = step.progress_percent();
        presenter.set_progress(step, percent);
        presenter.set_buttons(ButtonVisibility::for_step(step));

        if let Some(now) = started_at {
            self.form_started = true;
            self.form_start_time = Some(now);
            emitter.emit_bare(EventName::FormStart);
            info!(step = %step, "Form start fired");
        }
        emitter.emit(
            EventName::FormStep,
            json!({
                "step_index": step.get(),
                "step_name": step.name(),
                "field_group": "qualification",
            }),
        );
        debug!(step = %step, name = step.name(), percent, "Step activated");
        Ok(())
    }

    fn require_step(&self, action: NavAction) -> Result<StepIndex, NavigationError> {
        self.current_step().ok_or_else(|| self.invalid(action))
    }

    fn invalid(&self, action: NavAction) -> NavigationError {
        debug!(state = %self.state, action = %action, "Transition not available");
        NavigationError::InvalidTransition {
            state: self.state.to_string(),
            action: action.to_string(),
        }
    }
}

/// Run validation for `step`, reporting a block as an event.
fn check(
    step: StepIndex,
    answers: &FormAnswers,
    presenter: &mut dyn Presenter,
    emitter: &EventEmitter,
) -> Result<(), NavigationError> {
    validate_step(step, answers).map_err(|blocked| {
        report_blocked(&blocked, presenter, emitter);
        NavigationError::Blocked(blocked)
    })
}

fn report_blocked(blocked: &ValidationBlocked, presenter: &mut dyn Presenter, emitter: &EventEmitter) {
    warn!(
        step = %blocked.step,
        field = blocked.field,
        reason = %blocked.reason,
        "Validation failed"
    );
    emitter.emit(
        EventName::FormValidationError,
        json!({
            "step": blocked.step.get(),
            "field": blocked.field,
            "reason": blocked.reason,
        }),
    );
    presenter.focus_field(blocked.field);
}
