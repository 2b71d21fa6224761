//! Lead tiering engine.
//!
//! Each policy is an ordered table of `(predicate, tier)` rows evaluated
//! top to bottom; the first matching row decides the tier. When nothing
//! matches the lead falls through to [`Tier::C`].

pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::funnel::model::FormAnswers;

pub use rules::{TierRule, AESTHETIC_RULES, IMPLANTS_RULES};

/// Lead priority tier, strongest first. Anything but `C` is qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    A,
    B1,
    B2,
    B3,
    C,
}

impl Tier {
    pub const ALL: [Tier; 5] = [Tier::A, Tier::B1, Tier::B2, Tier::B3, Tier::C];

    pub fn is_qualified(self) -> bool {
        self != Tier::C
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::B3 => "B3",
            Self::C => "C",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two fixed deployment policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieringPolicy {
    /// Smile design thresholds.
    Aesthetic,
    /// Implants and oral rehabilitation thresholds, higher budgets.
    Implants,
}

impl TieringPolicy {
    /// Ordered rule table for this policy.
    pub fn rules(self) -> &'static [TierRule] {
        match self {
            Self::Aesthetic => AESTHETIC_RULES,
            Self::Implants => IMPLANTS_RULES,
        }
    }

    /// Classify a lead. Total over every combination of answers.
    pub fn evaluate(self, answers: &FormAnswers) -> TierDecision {
        let decision = self
            .rules()
            .iter()
            .find(|rule| (rule.matches)(answers))
            .map(|rule| TierDecision {
                tier: rule.tier,
                rule: rule.name,
            })
            .unwrap_or(TierDecision {
                tier: Tier::C,
                rule: "no_match",
            });

        debug!(
            policy = ?self,
            priority = ?answers.priority,
            timeline = ?answers.timeline,
            investment = ?answers.investment_range,
            accepted = answers.accepted_conditions,
            tier = %decision.tier,
            rule = decision.rule,
            "Lead tier calculated"
        );

        decision
    }
}

/// A tier together with the row that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierDecision {
    pub tier: Tier,
    pub rule: &'static str,
}

impl TierDecision {
    pub fn is_qualified(&self) -> bool {
        self.tier.is_qualified()
    }
}

/// Shorthand for `policy.evaluate(answers).tier`.
pub fn tier(answers: &FormAnswers, policy: TieringPolicy) -> Tier {
    policy.evaluate(answers).tier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::model::ChoiceField;

    const POLICIES: [TieringPolicy; 2] = [TieringPolicy::Aesthetic, TieringPolicy::Implants];

    const PRIORITIES: [&str; 4] = ["alta", "media", "explorando", "baja"];
    const TIMELINES: [&str; 5] = ["7-14", "este_mes", "60_dias", "no_seguro", "otro"];
    const INVESTMENTS: [&str; 7] = [
        "1500_3000",
        "3000_6000",
        "6000_12000",
        "6000_plus",
        "12000_plus",
        "undisclosed",
        "otro",
    ];

    fn answers(priority: &str, timeline: &str, investment: &str, accepted: bool) -> FormAnswers {
        let mut a = FormAnswers {
            accepted_conditions: accepted,
            ..Default::default()
        };
        a.set_choice(ChoiceField::Priority, priority);
        a.set_choice(ChoiceField::Timeline, timeline);
        a.set_choice(ChoiceField::InvestmentRange, investment);
        a
    }

    #[test]
    fn implants_examples() {
        let p = TieringPolicy::Implants;
        assert_eq!(tier(&answers("alta", "7-14", "12000_plus", true), p), Tier::A);
        assert_eq!(tier(&answers("alta", "60_dias", "3000_6000", true), p), Tier::B3);
        assert_eq!(
            tier(&answers("explorando", "7-14", "12000_plus", true), p),
            Tier::C
        );
    }

    #[test]
    fn aesthetic_example() {
        let a = answers("media", "este_mes", "6000_plus", true);
        assert_eq!(tier(&a, TieringPolicy::Aesthetic), Tier::B3);
    }

    #[test]
    fn explore_override_reports_its_rule() {
        let d = TieringPolicy::Implants.evaluate(&answers("explorando", "7-14", "12000_plus", true));
        assert_eq!(d.rule, "exploring_only");
    }

    #[test]
    fn unaccepted_conditions_are_always_c() {
        for policy in POLICIES {
            for p in PRIORITIES {
                for t in TIMELINES {
                    for i in INVESTMENTS {
                        let d = policy.evaluate(&answers(p, t, i, false));
                        assert_eq!(d.tier, Tier::C);
                        assert_eq!(d.rule, "conditions_not_accepted");
                    }
                }
            }
            assert_eq!(tier(&FormAnswers::default(), policy), Tier::C);
        }
    }

    #[test]
    fn qualification_matches_tier_everywhere() {
        for policy in POLICIES {
            for p in PRIORITIES {
                for t in TIMELINES {
                    for i in INVESTMENTS {
                        for accepted in [true, false] {
                            let a = answers(p, t, i, accepted);
                            let d = policy.evaluate(&a);
                            assert!(Tier::ALL.contains(&d.tier));
                            assert_eq!(d.is_qualified(), d.tier != Tier::C);
                            assert_eq!(policy.evaluate(&a), d, "deterministic");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn missing_answers_fall_through_to_c() {
        let a = FormAnswers {
            accepted_conditions: true,
            ..Default::default()
        };
        for policy in POLICIES {
            let d = policy.evaluate(&a);
            assert_eq!(d.tier, Tier::C);
            assert_eq!(d.rule, "no_match");
        }
    }

    #[test]
    fn tier_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Tier::B2).unwrap(), "\"B2\"");
        assert_eq!(Tier::A.to_string(), "A");
        assert!(!Tier::C.is_qualified());
        assert!(Tier::B3.is_qualified());
    }
}
