//! Qualification answers, step indices, and the submission receipt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::AttributionContext;
use crate::tiering::Tier;

use super::presenter::Presenter;

/// Number of numbered steps in the wizard.
pub const TOTAL_STEPS: u8 = 6;

/// Names reported in `form_step` events, indexed by step number.
const STEP_NAMES: [&str; TOTAL_STEPS as usize] = [
    "first_name",
    "primary_goal",
    "timeline",
    "priority",
    "investment_range",
    "consent",
];

/// A 1-based step number. Always within `1..=TOTAL_STEPS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StepIndex(u8);

impl StepIndex {
    pub const FIRST: StepIndex = StepIndex(1);
    pub const LAST: StepIndex = StepIndex(TOTAL_STEPS);

    /// Build a step index, rejecting anything outside `1..=TOTAL_STEPS`.
    pub fn new(step: u8) -> Option<Self> {
        (1..=TOTAL_STEPS).contains(&step).then_some(Self(step))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_first(self) -> bool {
        self == Self::FIRST
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    pub fn prev(self) -> Option<Self> {
        Self::new(self.0.saturating_sub(1))
    }

    /// Event-facing name of this step.
    pub fn name(self) -> &'static str {
        step_name(self.0)
    }

    /// Progress through the wizard, rounded to a whole percent.
    pub fn progress_percent(self) -> u8 {
        ((f64::from(self.0) / f64::from(TOTAL_STEPS)) * 100.0).round() as u8
    }
}

/// Resolve a raw step number to its event name; out-of-range is `"unknown"`.
pub fn step_name(step: u8) -> &'static str {
    match step {
        1..=TOTAL_STEPS => STEP_NAMES[usize::from(step - 1)],
        _ => "unknown",
    }
}

impl TryFrom<u8> for StepIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("step {value} outside 1..={TOTAL_STEPS}"))
    }
}

impl From<StepIndex> for u8 {
    fn from(step: StepIndex) -> Self {
        step.0
    }
}

impl std::fmt::Display for StepIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares a radio-backed answer enum. Known options get a variant; any
/// other submitted value is kept verbatim in `Other`.
macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            /// The option value as submitted by the form.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $value,)+
                    Self::Other(value) => value,
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $($value => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from(value.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

option_enum! {
    /// What the respondent wants to achieve. Implants and aesthetic goals share one field.
    PrimaryGoal {
        MissingTeeth => "piezas_faltantes",
        Instability => "inestabilidad",
        Prosthesis => "protesis",
        ImplantEvaluation => "evaluacion_implantes",
        Harmonious => "armonica",
        Confidence => "confianza",
        Correct => "corregir",
        Undecided => "no_seguro",
    }
}

option_enum! {
    /// Desired start window.
    Timeline {
        SevenToFourteenDays => "7-14",
        ThisMonth => "este_mes",
        SixtyDays => "60_dias",
        NotSure => "no_seguro",
    }
}

option_enum! {
    /// Self-reported priority.
    Priority {
        High => "alta",
        Medium => "media",
        Exploring => "explorando",
    }
}

option_enum! {
    /// Investment bucket in USD.
    InvestmentRange {
        From1500To3000 => "1500_3000",
        From3000To6000 => "3000_6000",
        From6000To12000 => "6000_12000",
        Over6000 => "6000_plus",
        Over12000 => "12000_plus",
        Undisclosed => "undisclosed",
    }
}

/// Radio-backed fields, in step order (steps 2..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChoiceField {
    PrimaryGoal,
    Timeline,
    Priority,
    InvestmentRange,
}

impl ChoiceField {
    pub const ALL: [ChoiceField; 4] = [
        Self::PrimaryGoal,
        Self::Timeline,
        Self::Priority,
        Self::InvestmentRange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryGoal => "primary_goal",
            Self::Timeline => "timeline",
            Self::Priority => "priority",
            Self::InvestmentRange => "investment_range",
        }
    }

    /// The field a step designates, for steps 2..=5.
    pub fn for_step(step: StepIndex) -> Option<Self> {
        match step.get() {
            2 => Some(Self::PrimaryGoal),
            3 => Some(Self::Timeline),
            4 => Some(Self::Priority),
            5 => Some(Self::InvestmentRange),
            _ => None,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Checkbox-backed fields on the consent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleField {
    AcceptedConditions,
    WhatsappOptIn,
}

impl ToggleField {
    pub const ALL: [ToggleField; 2] = [Self::AcceptedConditions, Self::WhatsappOptIn];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcceptedConditions => "accepted_conditions",
            Self::WhatsappOptIn => "whatsapp_opt_in",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Answers collected by the wizard.
///
/// Stored under the `form_data` key as JSON. Unanswered fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAnswers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_goal: Option<PrimaryGoal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_range: Option<InvestmentRange>,
    #[serde(default)]
    pub accepted_conditions: bool,
    #[serde(default)]
    pub whatsapp_opt_in: bool,
}

impl FormAnswers {
    /// Merge the presentation's current values into these answers.
    ///
    /// The name is always overwritten. A choice is only overwritten when an
    /// option is checked. A checkbox is overwritten whenever it exists.
    pub fn capture(&mut self, presenter: &dyn Presenter) {
        self.first_name = Some(presenter.first_name());

        for field in ChoiceField::ALL {
            if let Some(value) = presenter.checked_option(field) {
                self.set_choice(field, &value);
            }
        }

        for field in ToggleField::ALL {
            if let Some(checked) = presenter.checkbox(field) {
                self.set_toggle(field, checked);
            }
        }
    }

    /// Whether any option has been recorded for `field`.
    pub fn has_choice(&self, field: ChoiceField) -> bool {
        self.choice(field).is_some()
    }

    /// The recorded value of a choice field as submitted.
    pub fn choice(&self, field: ChoiceField) -> Option<&str> {
        match field {
            ChoiceField::PrimaryGoal => self.primary_goal.as_ref().map(PrimaryGoal::as_str),
            ChoiceField::Timeline => self.timeline.as_ref().map(Timeline::as_str),
            ChoiceField::Priority => self.priority.as_ref().map(Priority::as_str),
            ChoiceField::InvestmentRange => {
                self.investment_range.as_ref().map(InvestmentRange::as_str)
            }
        }
    }

    pub fn set_choice(&mut self, field: ChoiceField, value: &str) {
        match field {
            ChoiceField::PrimaryGoal => self.primary_goal = Some(value.into()),
            ChoiceField::Timeline => self.timeline = Some(value.into()),
            ChoiceField::Priority => self.priority = Some(value.into()),
            ChoiceField::InvestmentRange => self.investment_range = Some(value.into()),
        }
    }

    pub fn toggle(&self, field: ToggleField) -> bool {
        match field {
            ToggleField::AcceptedConditions => self.accepted_conditions,
            ToggleField::WhatsappOptIn => self.whatsapp_opt_in,
        }
    }

    pub fn set_toggle(&mut self, field: ToggleField, checked: bool) {
        match field {
            ToggleField::AcceptedConditions => self.accepted_conditions = checked,
            ToggleField::WhatsappOptIn => self.whatsapp_opt_in = checked,
        }
    }

    /// First name with surrounding whitespace removed.
    pub fn trimmed_name(&self) -> &str {
        self.first_name.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Non-PII record of the last successful submission.
///
/// Stored under `lead_last_submission`; never cleared by the funnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub timestamp: DateTime<Utc>,
    pub short_id: String,
    pub lead_tier: Tier,
    pub is_qualified: bool,
    pub primary_goal: Option<PrimaryGoal>,
    pub timeline: Option<Timeline>,
    pub priority: Option<Priority>,
    pub investment_range: Option<InvestmentRange>,
    pub session_id: String,
    pub lead_id: String,
    #[serde(flatten)]
    pub attribution: AttributionContext,
}
