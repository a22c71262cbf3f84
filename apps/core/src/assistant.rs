//! Host-facing facade over the core components.
//!
//! One [`Assistant`] owns a single resolver, a single shared learning store
//! and the pure components. It is `Send + Sync` and meant to be shared behind
//! an `Arc` by the surrounding service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::augment::{AugmentRequest, Augmenter};
use crate::brain::classifier::{IntentModel, TextClassifier};
use crate::brain::composer::{diet_recommendations, ResponseComposer};
use crate::brain::entities::{Entity, EntityExtractor};
use crate::brain::intent::{Intent, IntentResult};
use crate::brain::keywords::KeywordExtractor;
use crate::brain::resolver::IntentResolver;
use crate::config::CoreConfig;
use crate::error::AppError;
use crate::health::{HealthAssessment, HealthScorer};
use crate::learning::{LearningStats, LearningStore};
use crate::microbiome::{AbundanceMatrix, MetricsEngine};
use crate::models::{MicrobiomeProfile, UserProfile, WearableSample};

/// A fresh session id for requests that do not carry one.
fn default_session() -> String {
    Uuid::new_v4().to_string()
}

/// A chat message together with the caller's stored profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default = "default_session")]
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
    #[serde(default)]
    pub microbiome: Option<MicrobiomeProfile>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            session_id: default_session(),
            message: message.into(),
            user_profile: None,
            microbiome: None,
        }
    }
}

/// Where the reply text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Composed,
    Augmented,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    /// Always the resolver's result, whichever source produced the text.
    pub intent: IntentResult,
    pub keywords: Vec<String>,
    pub entities: Vec<Entity>,
    /// Diet recommendations; only for gut-health and diet intents with a
    /// microbiome profile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    pub source: ReplySource,
}

pub struct Assistant {
    learning: Arc<LearningStore>,
    resolver: IntentResolver,
    composer: ResponseComposer,
    metrics: MetricsEngine,
    health: HealthScorer,
    keywords: KeywordExtractor,
    entities: EntityExtractor,
}

impl Assistant {
    /// Fits the seed classifier and builds a store sized by the configuration.
    pub fn new(config: &CoreConfig) -> Result<Self, AppError> {
        let learning = match config.learning_max {
            Some(capacity) => LearningStore::with_capacity(capacity),
            None => LearningStore::new(),
        };
        let model = IntentModel::seeded(config.training_config())?;
        info!(
            classes = model.classes().len(),
            vocabulary = model.vectorizer().vocabulary_size(),
            "Intent classifier fitted"
        );
        Ok(Self::with_classifier(Arc::new(learning), Arc::new(model)))
    }

    /// Builds an assistant around an existing store and classifier.
    pub fn with_classifier(
        learning: Arc<LearningStore>,
        classifier: Arc<dyn TextClassifier>,
    ) -> Self {
        Self {
            resolver: IntentResolver::new(Arc::clone(&learning), classifier),
            learning,
            composer: ResponseComposer::new(),
            metrics: MetricsEngine::new(),
            health: HealthScorer::new(),
            keywords: KeywordExtractor::new(),
            entities: EntityExtractor::new(),
        }
    }

    pub fn learning(&self) -> &Arc<LearningStore> {
        &self.learning
    }

    pub fn resolve_intent(&self, text: &str) -> IntentResult {
        self.resolver.resolve(text)
    }

    pub fn compose_response(
        &self,
        result: &IntentResult,
        user: Option<&UserProfile>,
        microbiome: Option<&MicrobiomeProfile>,
    ) -> String {
        self.composer.compose(result, user, microbiome)
    }

    pub fn compute_profile(&self, matrix: &AbundanceMatrix) -> Result<MicrobiomeProfile, AppError> {
        self.metrics.compute_profile(matrix)
    }

    /// Per-sample normalized abundances, for hosts that store the raw table.
    pub fn normalized_records(&self, matrix: &AbundanceMatrix) -> Vec<BTreeMap<String, f64>> {
        self.metrics.normalized_records(matrix)
    }

    /// Records user feedback for `text`.
    ///
    /// Labels outside the intent vocabulary are stored as `unknown`. Empty
    /// strings count as absent. Always returns `true`.
    pub fn record_feedback(
        &self,
        text: &str,
        custom_response: Option<&str>,
        intent_label: Option<&str>,
    ) -> bool {
        let intent = intent_label
            .filter(|label| !label.trim().is_empty())
            .map(|label| {
                label.parse::<Intent>().unwrap_or_else(|e| {
                    warn!("{}; storing as {}", e, Intent::Unknown);
                    Intent::Unknown
                })
            });
        self.learning.update(text, custom_response, intent)
    }

    pub fn learning_stats(&self) -> LearningStats {
        self.learning.stats()
    }

    pub fn assess_wearable(&self, sample: &WearableSample) -> HealthAssessment {
        self.health.assess(sample)
    }

    /// Runs a full chat turn.
    ///
    /// The deterministic reply is always composed first. When an augmenter is
    /// given and succeeds its text replaces the composed one; on failure the
    /// composed reply is kept.
    #[instrument(skip_all, fields(session = %request.session_id))]
    pub async fn reply(
        &self,
        request: ChatRequest,
        augmenter: Option<&dyn Augmenter>,
    ) -> ChatReply {
        let intent = self.resolve_intent(&request.message);
        let keywords = self.keywords.extract_keywords(&request.message, None);
        let entities = self.entities.extract(&request.message);
        let composed = self.compose_response(
            &intent,
            request.user_profile.as_ref(),
            request.microbiome.as_ref(),
        );

        let recommendations = match (&request.microbiome, intent.intent) {
            (Some(profile), Intent::GutHealth | Intent::DietSuggestion) => {
                diet_recommendations(profile, request.user_profile.as_ref())
            }
            _ => Vec::new(),
        };

        debug!(intent = %intent.intent, method = %intent.method, "Composed reply");

        let Some(augmenter) = augmenter else {
            return ChatReply {
                text: composed,
                intent,
                keywords,
                entities,
                recommendations,
                source: ReplySource::Composed,
            };
        };

        let augment_request = AugmentRequest {
            session_id: request.session_id,
            message: request.message,
            intent: intent.clone(),
            composed,
            user_profile: request.user_profile,
            microbiome: request.microbiome,
        };

        let (text, source) = match augmenter.augment(&augment_request).await {
            Ok(text) => (text, ReplySource::Augmented),
            Err(e) if e.is_degradable() => {
                warn!("Augmentation failed, keeping composed reply: {}", e);
                (augment_request.composed, ReplySource::Composed)
            }
            Err(e) => {
                error!("Augmenter returned an unexpected error, keeping composed reply: {}", e);
                (augment_request.composed, ReplySource::Composed)
            }
        };

        ChatReply {
            text,
            intent,
            keywords,
            entities,
            recommendations,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::entities::EntityType;
    use crate::brain::intent::Method;
    use crate::models::DiversityLevel;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    // --- Mock Augmenter ---

    struct MockAugmenter {
        response: Result<String, AppError>,
        seen: Mutex<Vec<AugmentRequest>>,
    }

    impl MockAugmenter {
        fn new(response: Result<String, AppError>) -> Self {
            Self {
                response,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Augmenter for MockAugmenter {
        async fn augment(&self, request: &AugmentRequest) -> Result<String, AppError> {
            self.seen.lock().unwrap().push(request.clone());
            self.response.clone()
        }
    }

    fn assistant() -> Assistant {
        Assistant::new(&CoreConfig::default()).unwrap()
    }

    fn profile() -> MicrobiomeProfile {
        let mut mean_abundance = BTreeMap::new();
        mean_abundance.insert("Bifidobacterium".to_string(), 0.05);
        mean_abundance.insert("Firmicutes".to_string(), 0.3);
        MicrobiomeProfile {
            sample_count: 2,
            mean_abundance,
            shannon_index: 1.2,
            risk_score: 0.7,
            diversity_level: DiversityLevel::Low,
            sample_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_reply_without_augmenter_is_composed() {
        let reply = assistant().reply(ChatRequest::new("hi there"), None).await;

        assert_eq!(reply.source, ReplySource::Composed);
        assert_eq!(reply.intent.intent, Intent::Hello);
        assert!(reply.text.starts_with("👋 Hello!"));
        assert!(reply.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_reply_attaches_recommendations_for_diet() {
        let mut request = ChatRequest::new("What should I eat?");
        request.microbiome = Some(profile());

        let reply = assistant().reply(request, None).await;

        assert_eq!(reply.intent.intent, Intent::DietSuggestion);
        assert_eq!(
            reply.recommendations,
            vec!["include yogurt or kefir for Bifidobacterium"]
        );
        assert!(reply.text.ends_with("include yogurt or kefir for Bifidobacterium"));
    }

    #[tokio::test]
    async fn test_reply_skips_recommendations_for_other_intents() {
        let mut request = ChatRequest::new("tell me about fiber");
        request.microbiome = Some(profile());

        let reply = assistant().reply(request, None).await;
        assert_eq!(reply.intent.intent, Intent::FiberInfo);
        assert!(reply.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_augmented_reply_replaces_text_but_keeps_intent() {
        // 1. Arrange
        let augmenter = MockAugmenter::new(Ok("Remote answer".to_string()));
        let assistant = assistant();

        // 2. Act
        let reply = assistant
            .reply(ChatRequest::new("Is kefir a probiotic?"), Some(&augmenter))
            .await;

        // 3. Assert
        assert_eq!(reply.source, ReplySource::Augmented);
        assert_eq!(reply.text, "Remote answer");
        assert_eq!(reply.intent.intent, Intent::ProbioticInfo);
        assert_eq!(reply.intent.method, Method::RuleBased);

        let seen = augmenter.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].composed.starts_with("🧫 Probiotics"));
    }

    #[tokio::test]
    async fn test_augmenter_failure_degrades_to_composed() {
        let augmenter = MockAugmenter::new(Err(AppError::Augment("timeout".to_string())));
        let assistant = assistant();

        let expected = assistant.compose_response(
            &assistant.resolve_intent("Is kefir a probiotic?"),
            None,
            None,
        );
        let reply = assistant
            .reply(ChatRequest::new("Is kefir a probiotic?"), Some(&augmenter))
            .await;

        assert_eq!(reply.source, ReplySource::Composed);
        assert_eq!(reply.text, expected);
        assert_eq!(reply.intent.intent, Intent::ProbioticInfo);
    }

    #[tokio::test]
    async fn test_unexpected_augmenter_error_still_keeps_composed_reply() {
        let augmenter = MockAugmenter::new(Err(AppError::Validation("bad payload".to_string())));
        let assistant = assistant();

        let reply = assistant
            .reply(ChatRequest::new("Is kefir a probiotic?"), Some(&augmenter))
            .await;

        assert!(!AppError::Validation(String::new()).is_degradable());
        assert_eq!(reply.source, ReplySource::Composed);
        assert!(reply.text.starts_with("🧫 Probiotics"));
        assert_eq!(augmenter.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_carries_named_entities() {
        let assistant = assistant();

        let reply = assistant
            .reply(
                ChatRequest::new("My friend from Mayo Clinic swears by kefir for IBS"),
                None,
            )
            .await;

        let found: Vec<(&str, EntityType)> = reply
            .entities
            .iter()
            .map(|e| (e.name.as_str(), e.entity_type))
            .collect();
        assert_eq!(
            found,
            vec![
                ("Mayo Clinic", EntityType::ProperNoun),
                ("kefir", EntityType::Food),
                ("IBS", EntityType::Condition),
            ]
        );
    }

    #[test]
    fn test_feedback_with_unknown_label_stores_unknown() {
        let assistant = assistant();
        assert!(assistant.record_feedback("tell me about fiber", None, Some("astrology")));

        let result = assistant.resolve_intent("Tell me about fiber");
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.method, Method::Learned);
    }

    #[test]
    fn test_feedback_without_payload_is_noop() {
        let assistant = assistant();
        assert!(assistant.record_feedback("hello", Some(""), Some("")));
        assert!(assistant.learning().is_empty());
        assert_eq!(assistant.resolve_intent("hello").method, Method::RuleBased);
    }

    #[test]
    fn test_learning_capacity_from_config() {
        let config = CoreConfig {
            learning_max: std::num::NonZeroUsize::new(1),
            ..CoreConfig::default()
        };
        let assistant = Assistant::new(&config).unwrap();
        assistant.record_feedback("first", None, Some("hello"));
        assistant.record_feedback("second", None, Some("hello"));

        assert_eq!(assistant.learning_stats().total_learned, 1);
        assert!(assistant.learning().lookup("first").is_none());
    }

    #[test]
    fn test_assistant_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Assistant>();
    }
}
