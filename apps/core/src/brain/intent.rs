//! Intent vocabulary and classification results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Closed set of intents a message can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Gut health in general (gut, digestion, microbiome)
    GutHealth,
    /// Probiotics and fermented foods
    ProbioticInfo,
    /// Fiber and prebiotics
    FiberInfo,
    /// Shannon index, diversity, risk
    DiversityInfo,
    /// Diet and meal suggestions
    DietSuggestion,
    /// Greeting
    Hello,
    /// A learned verbatim response pinned by user feedback
    Custom,
    /// Unknown/Default
    Unknown,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::GutHealth,
        Intent::ProbioticInfo,
        Intent::FiberInfo,
        Intent::DiversityInfo,
        Intent::DietSuggestion,
        Intent::Hello,
        Intent::Custom,
        Intent::Unknown,
    ];

    /// Wire label of the intent
    pub fn label(&self) -> &'static str {
        match self {
            Intent::GutHealth => "gut_health",
            Intent::ProbioticInfo => "probiotic_info",
            Intent::FiberInfo => "fiber_info",
            Intent::DiversityInfo => "diversity_info",
            Intent::DietSuggestion => "diet_suggestion",
            Intent::Hello => "hello",
            Intent::Custom => "custom",
            Intent::Unknown => "unknown",
        }
    }

    /// Parses a label, mapping anything unrecognized to [`Intent::Unknown`].
    pub fn from_label_lenient(label: &str) -> Intent {
        label.parse().unwrap_or(Intent::Unknown)
    }
}

impl FromStr for Intent {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Intent::ALL
            .iter()
            .copied()
            .find(|intent| intent.label() == wanted)
            .ok_or_else(|| AppError::Validation(format!("unknown intent label: {}", s)))
    }
}

/// Which stage of the resolution cascade produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Learned,
    RuleBased,
    MlBased,
    Fallback,
}

impl Method {
    pub fn label(&self) -> &'static str {
        match self {
            Method::Learned => "learned",
            Method::RuleBased => "rule_based",
            Method::MlBased => "ml_based",
            Method::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of intent resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Resolved intent
    pub intent: Intent,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    pub method: Method,
    /// Verbatim reply pinned by feedback; only set for learned results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_response: Option<String>,
}

impl IntentResult {
    pub fn learned(intent: Intent, literal_response: Option<String>) -> Self {
        Self {
            intent,
            confidence: 1.0,
            method: Method::Learned,
            literal_response,
        }
    }

    pub fn rule_based(intent: Intent) -> Self {
        Self {
            intent,
            confidence: 0.9,
            method: Method::RuleBased,
            literal_response: None,
        }
    }

    pub fn ml_based(intent: Intent, probability: f32) -> Self {
        Self {
            intent,
            confidence: probability.clamp(0.0, 1.0),
            method: Method::MlBased,
            literal_response: None,
        }
    }

    pub fn fallback() -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.3,
            method: Method::Fallback,
            literal_response: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for intent in Intent::ALL {
            assert_eq!(intent.label().parse::<Intent>().unwrap(), intent);
        }
    }

    #[test]
    fn test_lenient_parsing() {
        assert_eq!(Intent::from_label_lenient(" Probiotic_Info "), Intent::ProbioticInfo);
        assert_eq!(Intent::from_label_lenient("weather"), Intent::Unknown);
        assert!("weather".parse::<Intent>().is_err());
    }

    #[test]
    fn test_serde_labels() {
        let result = IntentResult::rule_based(Intent::DietSuggestion);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["intent"], "diet_suggestion");
        assert_eq!(json["method"], "rule_based");
        assert!(json.get("literal_response").is_none());
    }
}
