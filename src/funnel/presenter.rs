//! Presentation capability — the narrow interface the funnel drives.
//!
//! The page (or any other front end) implements [`Presenter`]. The funnel
//! only reads field values through it and pushes display state back; it never
//! touches page structure directly.

use std::collections::{HashMap, HashSet};

use crate::error::PresentationError;

use super::model::{ChoiceField, FormAnswers, StepIndex, ToggleField};

/// Which navigation buttons are visible for the active step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonVisibility {
    pub prev: bool,
    pub next: bool,
    pub submit: bool,
}

impl ButtonVisibility {
    pub fn for_step(step: StepIndex) -> Self {
        Self {
            prev: !step.is_first(),
            next: !step.is_last(),
            submit: step.is_last(),
        }
    }
}

/// Final display selected after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultView {
    Qualified {
        first_name: String,
        /// Service-specific qualified copy.
        message: String,
        /// Outbound deep link, if one could be built.
        whatsapp_link: Option<String>,
    },
    NotQualified,
}

/// Capabilities the funnel needs from the presentation layer.
pub trait Presenter {
    /// Current raw value of the name field.
    fn first_name(&self) -> String;

    /// Value of the checked option for a radio-backed field, if any.
    fn checked_option(&self, field: ChoiceField) -> Option<String>;

    /// Checkbox state, or `None` if the checkbox does not exist.
    fn checkbox(&self, field: ToggleField) -> Option<bool>;

    /// Push restored answers back into the inputs.
    fn restore_answers(&mut self, answers: &FormAnswers);

    /// Whether the presentation has a panel for `step`.
    fn has_step(&self, step: StepIndex) -> bool;

    /// Make `step` the only active step.
    fn activate_step(&mut self, step: StepIndex) -> Result<(), PresentationError>;

    fn set_progress(&mut self, step: StepIndex, percent: u8);

    fn set_buttons(&mut self, buttons: ButtonVisibility);

    /// Hide the wizard and show the final result.
    fn show_result(&mut self, view: ResultView) -> Result<(), PresentationError>;

    /// Move input focus to the field that blocked a transition.
    fn focus_field(&mut self, _field: &str) {}
}

/// In-memory presenter with no real UI behind it.
///
/// Used by tests and the REPL binary. Steps can be removed to simulate a
/// page that lacks them, and the result copy element can be dropped.
#[derive(Debug, Clone)]
pub struct HeadlessPresenter {
    pub name: String,
    pub choices: HashMap<ChoiceField, String>,
    pub checkboxes: HashMap<ToggleField, bool>,
    pub missing_steps: HashSet<StepIndex>,
    pub has_result_message: bool,
    pub active_step: Option<StepIndex>,
    pub progress: Option<u8>,
    pub buttons: Option<ButtonVisibility>,
    pub result: Option<ResultView>,
    pub focused: Option<String>,
}

impl Default for HeadlessPresenter {
    fn default() -> Self {
        Self {
            name: String::new(),
            choices: HashMap::new(),
            checkboxes: ToggleField::ALL.into_iter().map(|f| (f, false)).collect(),
            missing_steps: HashSet::new(),
            has_result_message: true,
            active_step: None,
            progress: None,
            buttons: None,
            result: None,
            focused: None,
        }
    }
}

impl HeadlessPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn pick(&mut self, field: ChoiceField, value: &str) {
        self.choices.insert(field, value.to_string());
    }

    pub fn set_checkbox(&mut self, field: ToggleField, checked: bool) {
        self.checkboxes.insert(field, checked);
    }
}

impl Presenter for HeadlessPresenter {
    fn first_name(&self) -> String {
        self.name.clone()
    }

    fn checked_option(&self, field: ChoiceField) -> Option<String> {
        self.choices.get(&field).cloned()
    }

    fn checkbox(&self, field: ToggleField) -> Option<bool> {
        self.checkboxes.get(&field).copied()
    }

    fn restore_answers(&mut self, answers: &FormAnswers) {
        if let Some(name) = answers.first_name.as_deref().filter(|n| !n.is_empty()) {
            self.name = name.to_string();
        }
        for field in ChoiceField::ALL {
            if let Some(value) = answers.choice(field) {
                self.choices.insert(field, value.to_string());
            }
        }
        for field in ToggleField::ALL {
            if answers.toggle(field) {
                self.checkboxes.insert(field, true);
            }
        }
    }

    fn has_step(&self, step: StepIndex) -> bool {
        !self.missing_steps.contains(&step)
    }

    fn activate_step(&mut self, step: StepIndex) -> Result<(), PresentationError> {
        if !self.has_step(step) {
            return Err(PresentationError::MissingTargetStep(step));
        }
        self.active_step = Some(step);
        Ok(())
    }

    fn set_progress(&mut self, _step: StepIndex, percent: u8) {
        self.progress = Some(percent);
    }

    fn set_buttons(&mut self, buttons: ButtonVisibility) {
        self.buttons = Some(buttons);
    }

    fn show_result(&mut self, view: ResultView) -> Result<(), PresentationError> {
        let missing_copy = matches!(view, ResultView::Qualified { .. }) && !self.has_result_message;
        self.result = Some(view);
        if missing_copy {
            return Err(PresentationError::MissingElement("result_message"));
        }
        Ok(())
    }

    fn focus_field(&mut self, field: &str) {
        self.focused = Some(field.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_per_step() {
        let first = ButtonVisibility::for_step(StepIndex::FIRST);
        assert!(!first.prev && first.next && !first.submit);

        let middle = ButtonVisibility::for_step(StepIndex::new(3).unwrap());
        assert!(middle.prev && middle.next && !middle.submit);

        let last = ButtonVisibility::for_step(StepIndex::LAST);
        assert!(last.prev && !last.next && last.submit);
    }

    #[test]
    fn restore_fills_inputs() {
        let mut presenter = HeadlessPresenter::new();
        let mut answers = FormAnswers {
            first_name: Some("Ana".into()),
            accepted_conditions: true,
            ..Default::default()
        };
        answers.set_choice(ChoiceField::Timeline, "7-14");

        presenter.restore_answers(&answers);

        assert_eq!(presenter.first_name(), "Ana");
        assert_eq!(
            presenter.checked_option(ChoiceField::Timeline).as_deref(),
            Some("7-14")
        );
        assert_eq!(presenter.checkbox(ToggleField::AcceptedConditions), Some(true));
        assert_eq!(presenter.checkbox(ToggleField::WhatsappOptIn), Some(false));
    }

    #[test]
    fn missing_step_is_reported() {
        let mut presenter = HeadlessPresenter::new();
        let step = StepIndex::new(2).unwrap();
        presenter.missing_steps.insert(step);
        assert!(matches!(
            presenter.activate_step(step),
            Err(PresentationError::MissingTargetStep(s)) if s == step
        ));
        assert!(presenter.active_step.is_none());
    }
}
