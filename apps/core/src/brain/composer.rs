//! Reply composition.
//!
//! Turns an [`IntentResult`] plus the caller's optional profiles into the
//! final reply text. Each intent has one fixed template with at most one `{}`
//! slot; the slot is filled from the microbiome profile when one is given and
//! left empty otherwise.

use super::intent::{Intent, IntentResult};
use crate::models::{format_decimal, MicrobiomeProfile, UserProfile};

const GUT_HEALTH_TEMPLATE: &str = "🧬 The gut microbiome supports digestion, immunity, and mental health. Your current microbiome shows {}.";
const PROBIOTIC_TEMPLATE: &str =
    "🧫 Probiotics are beneficial microbes found in yogurt, kefir, kimchi, and supplements. {}";
const FIBER_TEMPLATE: &str =
    "🌾 Fiber feeds your good gut bacteria. Eat fruits, veggies, legumes, and oats. {}";
const DIVERSITY_TEMPLATE: &str = "🌈 A diverse microbiome is a healthy one. Your Shannon Index is {}.";
const DIET_TEMPLATE: &str = "🥗 Based on your microbiome analysis: {}";
const HELLO_TEMPLATE: &str = "👋 Hello! I'm your personalized gut health assistant. I can analyze your microbiome data and provide tailored recommendations.";
const UNKNOWN_TEMPLATE: &str = "❓ I'm still learning about your specific needs. Try asking about gut health, probiotics, fiber, diet, or your microbiome analysis.";

const DAIRY_ALLERGY_NOTE: &str =
    "Given your dairy allergy, try coconut yogurt or fermented vegetables.";
const LOW_BIFIDO_NOTE: &str = "Your Bifidobacterium levels could benefit from more prebiotic fiber.";

const BIFIDOBACTERIUM: &str = "Bifidobacterium";
const FIRMICUTES: &str = "Firmicutes";

/// Bifidobacterium abundance below which it counts as low.
const LOW_BIFIDO_THRESHOLD: f64 = 0.15;
/// Firmicutes abundance above which it counts as overrepresented.
const HIGH_FIRMICUTES_THRESHOLD: f64 = 0.4;

pub const DEFAULT_DIET_RECOMMENDATION: &str = "maintain a diverse, plant-rich diet";

/// Template for an intent; `custom` without a stored response reads as unknown.
pub fn template_for(intent: Intent) -> &'static str {
    match intent {
        Intent::GutHealth => GUT_HEALTH_TEMPLATE,
        Intent::ProbioticInfo => PROBIOTIC_TEMPLATE,
        Intent::FiberInfo => FIBER_TEMPLATE,
        Intent::DiversityInfo => DIVERSITY_TEMPLATE,
        Intent::DietSuggestion => DIET_TEMPLATE,
        Intent::Hello => HELLO_TEMPLATE,
        Intent::Custom | Intent::Unknown => UNKNOWN_TEMPLATE,
    }
}

/// Ordered diet recommendations for a microbiome profile.
///
/// Every rule is checked, in order, and contributes at most one line. When no
/// rule fires the single default recommendation is returned.
pub fn diet_recommendations(
    microbiome: &MicrobiomeProfile,
    user: Option<&UserProfile>,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    let dairy_allergy = user.is_some_and(|u| u.has_allergy("dairy"));

    if microbiome.abundance(BIFIDOBACTERIUM) < LOW_BIFIDO_THRESHOLD {
        if dairy_allergy {
            recommendations.push("increase non-dairy fermented foods like kimchi".to_string());
        } else {
            recommendations.push("include yogurt or kefir for Bifidobacterium".to_string());
        }
    }

    if microbiome.abundance(FIRMICUTES) > HIGH_FIRMICUTES_THRESHOLD {
        recommendations.push("reduce processed sugars to balance Firmicutes".to_string());
    }

    if let Some(user) = user {
        if user.is_diet("vegetarian") {
            recommendations.push("eat lentils, oats, and leafy greens".to_string());
        }
        if user.goal.contains("digestion") {
            recommendations.push("add ginger and turmeric to your diet".to_string());
        }
    }

    if recommendations.is_empty() {
        recommendations.push(DEFAULT_DIET_RECOMMENDATION.to_string());
    }
    recommendations
}

/// Stateless reply composer
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn new() -> Self {
        Self
    }

    /// Composes the reply for a resolved intent.
    ///
    /// A learned literal response is returned verbatim. Without a microbiome
    /// profile the template slot stays empty, which can leave a sentence
    /// unfinished ("Your Shannon Index is .").
    pub fn compose(
        &self,
        result: &IntentResult,
        user: Option<&UserProfile>,
        microbiome: Option<&MicrobiomeProfile>,
    ) -> String {
        if let Some(literal) = &result.literal_response {
            return literal.clone();
        }

        let template = template_for(result.intent);
        let fill = microbiome
            .map(|profile| self.slot_value(result.intent, user, profile))
            .unwrap_or_default();

        template.replacen("{}", &fill, 1)
    }

    fn slot_value(
        &self,
        intent: Intent,
        user: Option<&UserProfile>,
        microbiome: &MicrobiomeProfile,
    ) -> String {
        let level = microbiome.diversity_level.as_str().to_lowercase();
        let shannon = format_decimal(microbiome.shannon_index);

        match intent {
            Intent::GutHealth => {
                format!("a Shannon Index of {} with {} diversity", shannon, level)
            }
            Intent::DiversityInfo => format!("{} ({})", shannon, level),
            Intent::DietSuggestion => diet_recommendations(microbiome, user).join(", "),
            Intent::ProbioticInfo => {
                if user.is_some_and(|u| u.has_allergy("dairy")) {
                    DAIRY_ALLERGY_NOTE.to_string()
                } else {
                    String::new()
                }
            }
            Intent::FiberInfo => {
                if microbiome.abundance(BIFIDOBACTERIUM) < LOW_BIFIDO_THRESHOLD {
                    LOW_BIFIDO_NOTE.to_string()
                } else {
                    String::new()
                }
            }
            Intent::Hello | Intent::Custom | Intent::Unknown => String::new(),
        }
    }
}
