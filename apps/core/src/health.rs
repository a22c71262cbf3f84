//! Wearable health scoring.
//!
//! Score deductions and qualitative warnings use separate thresholds. Stress
//! warns above 6 but is only scored above 5 (-10) and above 7 (-20); both sets
//! are kept as they are.

use serde::{Deserialize, Serialize};

use crate::models::{format_decimal, group_thousands, WearableSample};

const BASE_SCORE: f64 = 100.0;

const MIN_SLEEP_HOURS: f64 = 7.0;
const SLEEP_PENALTY_PER_HOUR: f64 = 10.0;

const LOW_STEPS: u32 = 5000;
const MODERATE_STEPS: u32 = 8000;
const LOW_STEPS_PENALTY: f64 = 15.0;
const MODERATE_STEPS_PENALTY: f64 = 8.0;

const HIGH_STRESS: i32 = 7;
const ELEVATED_STRESS: i32 = 5;
const HIGH_STRESS_PENALTY: f64 = 20.0;
const ELEVATED_STRESS_PENALTY: f64 = 10.0;

/// Stress level above which a warning is raised.
const STRESS_WARNING_LEVEL: i32 = 6;

/// Severity of a wearable warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Low,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthWarning {
    pub level: WarningLevel,
    pub message: String,
}

/// Qualitative and numeric reading of one wearable sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub insights: Vec<String>,
    pub warnings: Vec<HealthWarning>,
    /// 0..=100
    pub overall_score: u8,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HealthScorer;

impl HealthScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, sample: &WearableSample) -> HealthAssessment {
        let mut insights = Vec::new();
        let mut warnings = Vec::new();

        if sample.sleep_hours < MIN_SLEEP_HOURS {
            warnings.push(HealthWarning {
                level: WarningLevel::Moderate,
                message: format!(
                    "Sleep duration below optimal ({}h vs 8h)",
                    format_decimal(sample.sleep_hours)
                ),
            });
            insights.push("🛌 Sleep more for better gut health".to_string());
        }

        if sample.steps < LOW_STEPS {
            warnings.push(HealthWarning {
                level: WarningLevel::Low,
                message: format!(
                    "Daily steps below recommended ({} vs 10,000)",
                    group_thousands(sample.steps)
                ),
            });
            insights.push("🚶 Walk more to support microbes".to_string());
        }

        if sample.stress_score > STRESS_WARNING_LEVEL {
            warnings.push(HealthWarning {
                level: WarningLevel::Moderate,
                message: format!("Stress levels elevated ({}/10)", sample.stress_score),
            });
            insights.push("🧘 Practice relaxation to lower stress".to_string());
        }

        HealthAssessment {
            insights,
            warnings,
            overall_score: self.score(sample),
        }
    }

    /// Deducts from 100 for short sleep, few steps and high stress, clamped
    /// to [0, 100] and rounded to the nearest integer.
    pub fn score(&self, sample: &WearableSample) -> u8 {
        let mut score = BASE_SCORE;

        if sample.sleep_hours < MIN_SLEEP_HOURS {
            score -= (MIN_SLEEP_HOURS - sample.sleep_hours) * SLEEP_PENALTY_PER_HOUR;
        }

        if sample.steps < LOW_STEPS {
            score -= LOW_STEPS_PENALTY;
        } else if sample.steps < MODERATE_STEPS {
            score -= MODERATE_STEPS_PENALTY;
        }

        if sample.stress_score > HIGH_STRESS {
            score -= HIGH_STRESS_PENALTY;
        } else if sample.stress_score > ELEVATED_STRESS {
            score -= ELEVATED_STRESS_PENALTY;
        }

        score.clamp(0.0, BASE_SCORE).round() as u8
    }
}
