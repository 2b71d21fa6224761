//! Per-step validation over the in-memory answers.

use serde::Serialize;

use super::model::{ChoiceField, FormAnswers, StepIndex};

/// Why a step refused to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The free-text name was empty after trimming.
    Empty,
    /// No option was chosen for the step's field.
    NotSelected,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::NotSelected => write!(f, "not_selected"),
        }
    }
}

/// A blocked transition. Recoverable; the wizard stays where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationBlocked {
    pub step: StepIndex,
    pub field: &'static str,
    pub reason: BlockReason,
}

/// Check the answers required to leave `step`.
///
/// The consent step has no blocking rule: unaccepted conditions are routed
/// to tier C by the tiering engine instead.
pub fn validate_step(step: StepIndex, answers: &FormAnswers) -> Result<(), ValidationBlocked> {
    if step.is_first() {
        if answers.trimmed_name().is_empty() {
            return Err(ValidationBlocked {
                step,
                field: "first_name",
                reason: BlockReason::Empty,
            });
        }
        return Ok(());
    }

    match ChoiceField::for_step(step) {
        Some(field) if !answers.has_choice(field) => Err(ValidationBlocked {
            step,
            field: field.as_str(),
            reason: BlockReason::NotSelected,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: u8) -> StepIndex {
        StepIndex::new(n).unwrap()
    }

    #[test]
    fn empty_name_blocks_step_one() {
        let answers = FormAnswers {
            first_name: Some("  \t ".into()),
            ..Default::default()
        };
        let blocked = validate_step(step(1), &answers).unwrap_err();
        assert_eq!(blocked.field, "first_name");
        assert_eq!(blocked.reason, BlockReason::Empty);
        assert_eq!(blocked.step, step(1));
    }

    #[test]
    fn name_passes_step_one() {
        let answers = FormAnswers {
            first_name: Some(" Ana ".into()),
            ..Default::default()
        };
        assert!(validate_step(step(1), &answers).is_ok());
    }

    #[test]
    fn each_choice_step_requires_its_own_field() {
        let expected = [
            (2, "primary_goal"),
            (3, "timeline"),
            (4, "priority"),
            (5, "investment_range"),
        ];
        for (n, field) in expected {
            let blocked = validate_step(step(n), &FormAnswers::default()).unwrap_err();
            assert_eq!(blocked.field, field, "step {n}");
            assert_eq!(blocked.reason, BlockReason::NotSelected);
        }
    }

    #[test]
    fn choice_step_ignores_other_fields() {
        let mut answers = FormAnswers::default();
        answers.set_choice(ChoiceField::Timeline, "este_mes");
        assert!(validate_step(step(3), &answers).is_ok());
        assert!(validate_step(step(4), &answers).is_err());
    }

    #[test]
    fn consent_step_never_blocks() {
        let answers = FormAnswers::default();
        assert!(!answers.accepted_conditions);
        assert!(validate_step(StepIndex::LAST, &answers).is_ok());
    }

    #[test]
    fn reason_display_matches_wire() {
        assert_eq!(BlockReason::Empty.to_string(), "empty");
        assert_eq!(
            serde_json::to_string(&BlockReason::NotSelected).unwrap(),
            "\"not_selected\""
        );
    }
}
