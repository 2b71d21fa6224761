//! Decision tables for both service policies.
//!
//! Row order is significant and must be kept: rows are tried top to bottom
//! and the first match wins.

use crate::funnel::model::{FormAnswers, InvestmentRange, Priority, Timeline};

use super::Tier;

/// One row of a decision table.
#[derive(Debug, Clone, Copy)]
pub struct TierRule {
    /// Stable row name, reported in logs.
    pub name: &'static str,
    pub matches: fn(&FormAnswers) -> bool,
    pub tier: Tier,
}

/// Smile design policy.
pub const AESTHETIC_RULES: &[TierRule] = &[
    TierRule {
        name: "conditions_not_accepted",
        matches: conditions_not_accepted,
        tier: Tier::C,
    },
    TierRule {
        name: "high_intent_high_budget",
        matches: aesthetic::high_intent_high_budget,
        tier: Tier::A,
    },
    TierRule {
        name: "high_intent_mid_budget",
        matches: aesthetic::high_intent_mid_budget,
        tier: Tier::B1,
    },
    TierRule {
        name: "medium_intent_mid_budget",
        matches: aesthetic::medium_intent_mid_budget,
        tier: Tier::B2,
    },
    TierRule {
        name: "medium_intent_high_budget",
        matches: aesthetic::medium_intent_high_budget,
        tier: Tier::B3,
    },
];

/// Implants and oral rehabilitation policy.
pub const IMPLANTS_RULES: &[TierRule] = &[
    TierRule {
        name: "conditions_not_accepted",
        matches: conditions_not_accepted,
        tier: Tier::C,
    },
    TierRule {
        name: "exploring_only",
        matches: implants::exploring_only,
        tier: Tier::C,
    },
    TierRule {
        name: "high_intent_high_budget",
        matches: implants::high_intent_high_budget,
        tier: Tier::A,
    },
    TierRule {
        name: "high_intent_medium_budget",
        matches: implants::high_intent_medium_budget,
        tier: Tier::B1,
    },
    TierRule {
        name: "medium_intent_high_budget",
        matches: implants::medium_intent_high_budget,
        tier: Tier::B2,
    },
    TierRule {
        name: "medium_intent_medium_budget",
        matches: implants::medium_intent_medium_budget,
        tier: Tier::B3,
    },
];

fn conditions_not_accepted(a: &FormAnswers) -> bool {
    !a.accepted_conditions
}

/// High priority and a start within the month. Same for both policies.
fn high_intent(a: &FormAnswers) -> bool {
    matches!(a.priority, Some(Priority::High))
        && matches!(
            a.timeline,
            Some(Timeline::SevenToFourteenDays | Timeline::ThisMonth)
        )
}

fn timeline_is_not_sure(a: &FormAnswers) -> bool {
    matches!(a.timeline, Some(Timeline::NotSure))
}

mod aesthetic {
    use super::*;

    pub(super) fn high_intent_high_budget(a: &FormAnswers) -> bool {
        high_intent(a) && high_budget(a)
    }

    pub(super) fn high_intent_mid_budget(a: &FormAnswers) -> bool {
        high_intent(a) && mid_budget(a)
    }

    pub(super) fn medium_intent_mid_budget(a: &FormAnswers) -> bool {
        medium_intent(a) && mid_budget(a)
    }

    pub(super) fn medium_intent_high_budget(a: &FormAnswers) -> bool {
        medium_intent(a) && high_budget(a)
    }

    fn medium_intent(a: &FormAnswers) -> bool {
        matches!(a.priority, Some(Priority::High | Priority::Medium)) && !timeline_is_not_sure(a)
    }

    fn high_budget(a: &FormAnswers) -> bool {
        matches!(
            a.investment_range,
            Some(InvestmentRange::From3000To6000 | InvestmentRange::Over6000)
        )
    }

    fn mid_budget(a: &FormAnswers) -> bool {
        matches!(a.investment_range, Some(InvestmentRange::From1500To3000))
    }
}

mod implants {
    use super::*;

    pub(super) fn exploring_only(a: &FormAnswers) -> bool {
        matches!(a.priority, Some(Priority::Exploring))
    }

    pub(super) fn high_intent_high_budget(a: &FormAnswers) -> bool {
        high_intent(a) && high_budget(a)
    }

    pub(super) fn high_intent_medium_budget(a: &FormAnswers) -> bool {
        high_intent(a) && medium_budget(a)
    }

    pub(super) fn medium_intent_high_budget(a: &FormAnswers) -> bool {
        medium_intent(a) && high_budget(a)
    }

    pub(super) fn medium_intent_medium_budget(a: &FormAnswers) -> bool {
        medium_intent(a) && medium_budget(a)
    }

    fn medium_intent(a: &FormAnswers) -> bool {
        let late_high = matches!(a.priority, Some(Priority::High))
            && matches!(a.timeline, Some(Timeline::SixtyDays | Timeline::NotSure));
        let medium = matches!(a.priority, Some(Priority::Medium)) && !timeline_is_not_sure(a);
        late_high || medium
    }

    fn high_budget(a: &FormAnswers) -> bool {
        matches!(
            a.investment_range,
            Some(InvestmentRange::From6000To12000 | InvestmentRange::Over12000)
        )
    }

    fn medium_budget(a: &FormAnswers) -> bool {
        matches!(a.investment_range, Some(InvestmentRange::From3000To6000))
    }
}
