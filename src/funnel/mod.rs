//! The qualification wizard: answers model, validation, the step
//! navigator, and the composing session.

pub mod model;
pub mod navigator;
pub mod presenter;
pub mod session;
pub mod validation;

pub use model::{FormAnswers, StepIndex, SubmissionReceipt, TOTAL_STEPS};
pub use navigator::{NavAction, StepNavigator, WizardState};
pub use presenter::{ButtonVisibility, HeadlessPresenter, Presenter, ResultView};
pub use session::{Funnel, Signal, Stores, SubmissionOutcome};
pub use validation::{validate_step, BlockReason, ValidationBlocked};
