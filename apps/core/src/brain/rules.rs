//! Keyword rules for intent detection.
//!
//! Fixed keyword groups evaluated in priority order; the first group with a
//! keyword occurring anywhere in the lower-cased text wins. Matching is by
//! substring, so "hi" also fires inside "this".

use super::intent::Intent;

/// Keyword group for one intent
struct KeywordRule {
    intent: Intent,
    keywords: &'static [&'static str],
}

/// Rules in priority order. Gut health outranks greetings, so
/// "Hello, I need help with my gut health" resolves to gut health.
const RULES: &[KeywordRule] = &[
    KeywordRule {
        intent: Intent::GutHealth,
        keywords: &["gut", "digestion", "microbiome", "intestinal"],
    },
    KeywordRule {
        intent: Intent::ProbioticInfo,
        keywords: &["probiotic", "fermented", "yogurt", "kefir", "kimchi"],
    },
    KeywordRule {
        intent: Intent::FiberInfo,
        keywords: &["fiber", "prebiotic", "roughage"],
    },
    KeywordRule {
        intent: Intent::DiversityInfo,
        keywords: &["shannon", "diversity", "risk", "balance"],
    },
    KeywordRule {
        intent: Intent::DietSuggestion,
        keywords: &["diet", "food", "meal", "eat", "nutrition"],
    },
    KeywordRule {
        intent: Intent::Hello,
        keywords: &["hello", "hi", "hey", "greetings"],
    },
];

/// A rule hit: the intent and the keyword that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub intent: Intent,
    pub keyword: &'static str,
}

/// Deterministic keyword matcher
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleMatcher;

impl RuleMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Returns the first matching rule, or `None` when no keyword occurs.
    pub fn matches(&self, text: &str) -> Option<RuleMatch> {
        let lower = text.to_lowercase();

        RULES.iter().find_map(|rule| {
            rule.keywords
                .iter()
                .find(|kw| lower.contains(*kw))
                .map(|kw| RuleMatch {
                    intent: rule.intent,
                    keyword: kw,
                })
        })
    }
}
