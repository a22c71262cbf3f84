//! Intent resolution cascade.
//!
//! Stages run in a fixed order and the first one that decides wins:
//! 1. Learned override from user feedback
//! 2. Keyword rules
//! 3. Statistical classifier, when it is more than 60% sure
//! 4. Fallback to `unknown`

use std::sync::Arc;
use tracing::{debug, warn};

use super::classifier::TextClassifier;
use super::intent::IntentResult;
use super::rules::RuleMatcher;
use crate::learning::LearningStore;

/// Minimum probability for the statistical stage to decide.
pub const ML_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Resolves chat messages into [`IntentResult`]s.
///
/// The classifier is fitted beforehand and shared read-only; the learning
/// store is injected so feedback recorded elsewhere is seen immediately.
#[derive(Clone)]
pub struct IntentResolver {
    learning: Arc<LearningStore>,
    rules: RuleMatcher,
    classifier: Arc<dyn TextClassifier>,
}

impl IntentResolver {
    pub fn new(learning: Arc<LearningStore>, classifier: Arc<dyn TextClassifier>) -> Self {
        Self {
            learning,
            rules: RuleMatcher::new(),
            classifier,
        }
    }

    pub fn learning(&self) -> &Arc<LearningStore> {
        &self.learning
    }

    /// Classify the intent of a message
    pub fn resolve(&self, text: &str) -> IntentResult {
        if let Some(learned) = self.learning.lookup(text) {
            debug!(intent = %learned.intent, "Resolved from learned override");
            return IntentResult::learned(learned.intent, learned.response);
        }

        if let Some(hit) = self.rules.matches(text) {
            debug!(intent = %hit.intent, keyword = hit.keyword, "Resolved by keyword rule");
            return IntentResult::rule_based(hit.intent);
        }

        match self.classifier.predict(text) {
            Some(prediction) if prediction.probability > ML_CONFIDENCE_THRESHOLD => {
                debug!(
                    intent = %prediction.intent,
                    probability = prediction.probability,
                    "Resolved by statistical classifier"
                );
                return IntentResult::ml_based(prediction.intent, prediction.probability);
            }
            Some(_) => {}
            None => warn!("Statistical classifier produced no prediction, using fallback"),
        }

        IntentResult::fallback()
    }
}
