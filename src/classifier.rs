//! # Risk Classifier
//! Pure, synchronous keyword screening that runs in the chat request path.
//! No I/O, no state; bounded by (total keyword count × message length), so it
//! never adds visible latency to the user-facing call.
//!
//! Matching is case-insensitive substring scanning over three ranked tiers.
//! The first tier with any hit wins outright; lower tiers are not consulted,
//! but every keyword of the winning tier found in the message is reported.
//! Substring matching (no tokenization, no negation handling) is a deliberate
//! recall-over-precision tradeoff: "I do NOT want to kill myself" still flags
//! High. See the tests for where that limitation is pinned down.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
struct KeywordTiers {
    high: Vec<String>,
    medium: Vec<String>,
    low: Vec<String>,
}

static TIERS: Lazy<KeywordTiers> = Lazy::new(|| {
    let raw = include_str!("../crisis_keywords.json");
    serde_json::from_str::<KeywordTiers>(raw).expect("valid crisis keyword tiers")
});

/// Ranked urgency of the matched keyword tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    None,
}

/// Outcome of screening a single message. Produced fresh per message,
/// owned by the caller, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskVerdict {
    pub is_crisis: bool,
    pub severity: Severity,
    /// Every keyword of the winning tier found in the message, in tier order.
    pub matched_signals: Vec<String>,
}

impl RiskVerdict {
    fn clear() -> Self {
        Self {
            is_crisis: false,
            severity: Severity::None,
            matched_signals: Vec::new(),
        }
    }
}

/// Screens `text` against the ranked keyword tiers.
///
/// High and Medium verdicts set `is_crisis`; Low is informational only
/// (it softens the conversational reply but does not escalate).
/// Empty or whitespace-only input is always clear. Cannot fail.
pub fn classify(text: &str) -> RiskVerdict {
    if text.trim().is_empty() {
        return RiskVerdict::clear();
    }
    let lowered = text.to_lowercase();

    for (tier, severity) in [
        (&TIERS.high, Severity::High),
        (&TIERS.medium, Severity::Medium),
        (&TIERS.low, Severity::Low),
    ] {
        let matched: Vec<String> = tier
            .iter()
            .filter(|kw| lowered.contains(kw.as_str()))
            .cloned()
            .collect();
        if !matched.is_empty() {
            return RiskVerdict {
                is_crisis: matches!(severity, Severity::High | Severity::Medium),
                severity,
                matched_signals: matched,
            };
        }
    }

    RiskVerdict::clear()
}

/// Canned supportive line per tier, surfaced to the chat layer so the
/// companion stays in character while the alert pipeline runs behind it.
pub fn empathetic_reply(severity: Severity) -> Option<&'static str> {
    match severity {
        Severity::High => Some(
            "I'm hearing a lot of pain in your words, and I want you to know I'm right here \
             with you. You're not alone. Let's breathe together for a second. Your life has \
             value, and I'm here to support you through this. Would you like to talk about \
             what you're feeling?",
        ),
        Severity::Medium => Some(
            "Hey, I'm noticing you're going through something really tough right now. I'm \
             here for you, and I want you to know that these feelings won't last forever. \
             You're stronger than you think. Can you tell me more about what's happening?",
        ),
        Severity::Low => Some(
            "I can hear that you're struggling. It takes courage to share these feelings. \
             I'm here to listen without judgment. What's weighing on your heart?",
        ),
        Severity::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_tier_any_casing_and_position() {
        for (msg, keyword) in [
            ("I want to KILL MYSELF", "kill myself"),
            ("honestly... suicide has been on my mind", "suicide"),
            (
                "Some days I think I'd be Better Off Dead, you know?",
                "better off dead",
            ),
        ] {
            let v = classify(msg);
            assert!(v.is_crisis, "{msg:?} should be a crisis");
            assert_eq!(v.severity, Severity::High);
            assert!(
                v.matched_signals.contains(&keyword.to_string()),
                "{msg:?} should report {keyword:?}, got {:?}",
                v.matched_signals
            );
        }
    }

    #[test]
    fn medium_tier_is_crisis() {
        let v = classify("I just want to give up");
        assert_eq!(v.severity, Severity::Medium);
        assert!(v.is_crisis);
        assert_eq!(v.matched_signals, vec!["give up".to_string()]);
    }

    #[test]
    fn low_tier_flags_but_does_not_escalate() {
        let v = classify("everything feels hopeless and I'm so alone");
        assert_eq!(v.severity, Severity::Low);
        assert!(!v.is_crisis);
        assert_eq!(
            v.matched_signals,
            vec!["hopeless".to_string(), "alone".to_string()]
        );
    }

    #[test]
    fn clean_message_is_clear() {
        let v = classify("Hi, how are you?");
        assert_eq!(v.severity, Severity::None);
        assert!(!v.is_crisis);
        assert!(v.matched_signals.is_empty());
    }

    #[test]
    fn empty_and_whitespace_are_clear() {
        for msg in ["", "   ", "\n\t "] {
            let v = classify(msg);
            assert_eq!(v.severity, Severity::None);
            assert!(!v.is_crisis);
            assert!(v.matched_signals.is_empty());
        }
    }

    #[test]
    fn higher_tier_shadows_lower_tier() {
        // "want to die" (high) + "worthless" (medium) in one message:
        // only the winning tier's keywords are collected.
        let v = classify("I feel worthless and I want to die");
        assert_eq!(v.severity, Severity::High);
        assert_eq!(v.matched_signals, vec!["want to die".to_string()]);
    }

    #[test]
    fn multiple_keywords_within_winning_tier_all_reported() {
        let v = classify("suicide... I want to die, there's no reason to live");
        assert_eq!(v.severity, Severity::High);
        assert_eq!(
            v.matched_signals,
            vec![
                "suicide".to_string(),
                "want to die".to_string(),
                "no reason to live".to_string()
            ]
        );
    }

    // Documented limitation, not a bug: substring matching has no negation
    // handling, so a negated statement still trips the high tier. Changing
    // this would change recall characteristics and is out of scope.
    #[test]
    fn negated_statement_still_flags_high() {
        let v = classify("I do NOT want to kill myself");
        assert_eq!(v.severity, Severity::High);
        assert!(v.is_crisis);
    }

    #[test]
    fn replies_exist_for_all_flagged_tiers() {
        assert!(empathetic_reply(Severity::High).is_some());
        assert!(empathetic_reply(Severity::Medium).is_some());
        assert!(empathetic_reply(Severity::Low).is_some());
        assert!(empathetic_reply(Severity::None).is_none());
    }
}
