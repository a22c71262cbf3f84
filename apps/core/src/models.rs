use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use validator::Validate;

/// Coarse diversity bucket derived from the averaged Shannon index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiversityLevel {
    Low,
    Moderate,
    High,
}

impl DiversityLevel {
    /// Buckets a Shannon index: `< 1.5` Low, `[1.5, 2.5)` Moderate, otherwise High.
    pub fn from_shannon(shannon: f64) -> Self {
        if shannon < 1.5 {
            DiversityLevel::Low
        } else if shannon < 2.5 {
            DiversityLevel::Moderate
        } else {
            DiversityLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiversityLevel::Low => "Low",
            DiversityLevel::Moderate => "Moderate",
            DiversityLevel::High => "High",
        }
    }
}

impl fmt::Display for DiversityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diversity and risk summary of one uploaded abundance table.
///
/// Computed once per upload by [`crate::microbiome::MetricsEngine`]; the calling
/// service owns it afterwards and hands it back by reference on each chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrobiomeProfile {
    /// Number of samples (rows) in the source table.
    pub sample_count: usize,
    /// Mean normalized abundance per taxon across samples.
    #[serde(alias = "microbes")]
    pub mean_abundance: BTreeMap<String, f64>,
    /// Averaged Shannon index, rounded to 2 decimals.
    pub shannon_index: f64,
    /// `1 - shannon / 4` clamped to [0, 1], rounded to 2 decimals.
    pub risk_score: f64,
    pub diversity_level: DiversityLevel,
    /// Identifiers taken from the `SampleID` column, when the table had one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_ids: Vec<String>,
}

impl MicrobiomeProfile {
    /// Mean abundance of a taxon; taxa absent from the table count as zero.
    pub fn abundance(&self, taxon: &str) -> f64 {
        self.mean_abundance.get(taxon).copied().unwrap_or(0.0)
    }
}

/// Per-request user context supplied by the caller. Never persisted by the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserProfile {
    #[serde(default)]
    pub diet: Option<String>,
    #[serde(default)]
    pub allergies: BTreeSet<String>,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub conditions: BTreeSet<String>,
    #[serde(default)]
    #[validate(range(max = 130))]
    pub age: Option<u32>,
}

impl UserProfile {
    pub fn has_allergy(&self, allergen: &str) -> bool {
        self.allergies.contains(allergen)
    }

    pub fn is_diet(&self, diet: &str) -> bool {
        self.diet.as_deref() == Some(diet)
    }
}

/// One reading from a wearable device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearableSample {
    pub sleep_hours: f64,
    pub steps: u32,
    /// Self-reported or device stress score, expected in 0..=10.
    pub stress_score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
}

/// Renders a float the way a decimal literal reads: always at least one
/// fractional digit (`2` -> `2.0`, `2.35` -> `2.35`).
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Formats an integer with comma thousands separators (`12500` -> `12,500`).
pub fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diversity_thresholds() {
        assert_eq!(DiversityLevel::from_shannon(0.0), DiversityLevel::Low);
        assert_eq!(DiversityLevel::from_shannon(1.49), DiversityLevel::Low);
        assert_eq!(DiversityLevel::from_shannon(1.5), DiversityLevel::Moderate);
        assert_eq!(DiversityLevel::from_shannon(2.49), DiversityLevel::Moderate);
        assert_eq!(DiversityLevel::from_shannon(2.5), DiversityLevel::High);
    }

    #[test]
    fn test_profile_accepts_microbes_alias() {
        let json = r#"{
            "sample_count": 2,
            "microbes": {"Bifidobacterium": 0.1},
            "shannon_index": 1.2,
            "risk_score": 0.7,
            "diversity_level": "Low"
        }"#;
        let profile: MicrobiomeProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.abundance("Bifidobacterium"), 0.1);
        assert_eq!(profile.abundance("Firmicutes"), 0.0);
        assert!(profile.sample_ids.is_empty());
    }

    #[test]
    fn test_user_profile_defaults_and_validation() {
        let profile: UserProfile = serde_json::from_str(r#"{"allergies": ["dairy"]}"#).unwrap();
        assert!(profile.has_allergy("dairy"));
        assert!(profile.diet.is_none());
        assert!(profile.validate().is_ok());

        let bad = UserProfile {
            age: Some(200),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_decimal(2.0), "2.0");
        assert_eq!(format_decimal(2.35), "2.35");
        assert_eq!(format_decimal(6.5), "6.5");
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(4200), "4,200");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
