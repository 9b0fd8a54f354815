//! Profile classification
//!
//! Maps analyzed signals to a human-readable profile through an ordered rule
//! table. Rules are evaluated top-down and the first match wins; the last rule
//! always matches.

use crate::types::{AnalyzedSignals, Profile};

/// Focus score below which a developer is considered scattered
pub const SCATTERED_FOCUS_BELOW: u8 = 30;

/// A single `(predicate, result)` classification rule
pub struct ProfileRule {
    pub predicate: fn(&AnalyzedSignals) -> bool,
    pub title: &'static str,
    pub insight: &'static str,
}

/// Classification rules in priority order
pub const PROFILE_RULES: &[ProfileRule] = &[
    ProfileRule {
        predicate: is_scattered,
        title: "High Context Switcher",
        insight: "Frequent context switching detected. You may be multitasking heavily.",
    },
    ProfileRule {
        predicate: is_high_speed,
        title: "Hyper Productive Mode",
        insight: "You are coding at high speed. Stay consistent.",
    },
    ProfileRule {
        predicate: always,
        title: "Balanced Developer",
        insight: "Your workflow shows moderate typing speed and reasonable focus.",
    },
];

fn is_scattered(signals: &AnalyzedSignals) -> bool {
    signals.focus_score < SCATTERED_FOCUS_BELOW
}

fn is_high_speed(signals: &AnalyzedSignals) -> bool {
    signals.typing_speed > 100.0
}

fn always(_: &AnalyzedSignals) -> bool {
    true
}

/// Profile classifier over [`PROFILE_RULES`]
pub struct ProfileClassifier;

impl ProfileClassifier {
    /// Classify signals into a profile
    pub fn classify(signals: &AnalyzedSignals) -> Profile {
        let rule = PROFILE_RULES
            .iter()
            .find(|rule| (rule.predicate)(signals))
            .unwrap_or(&PROFILE_RULES[PROFILE_RULES.len() - 1]);

        Profile {
            title: rule.title.to_string(),
            insight: rule.insight.to_string(),
        }
    }
}
