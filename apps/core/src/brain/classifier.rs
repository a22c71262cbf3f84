//! Statistical intent classifier.
//!
//! TF-IDF features over a fixed seed corpus feeding a multinomial logistic
//! regression. The model is fitted once at startup by plain full-batch
//! gradient descent from zero weights, so two fits over the same corpus and
//! settings produce identical weights.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::intent::Intent;
use crate::error::AppError;

/// Version tag of [`SEED_CORPUS`]. Bump whenever the corpus changes.
pub const SEED_CORPUS_VERSION: u32 = 1;

/// Labeled phrases the classifier is fitted on.
pub const SEED_CORPUS: &[(&str, Intent)] = &[
    ("Tell me about probiotics", Intent::ProbioticInfo),
    ("digestion problems", Intent::GutHealth),
    ("what to eat", Intent::DietSuggestion),
    ("kimchi good", Intent::ProbioticInfo),
    ("Shannon index", Intent::DiversityInfo),
    ("hi", Intent::Hello),
    ("hello", Intent::Hello),
    ("gut health", Intent::GutHealth),
    ("microbiome analysis", Intent::GutHealth),
    ("fiber intake", Intent::FiberInfo),
    ("fermented foods", Intent::ProbioticInfo),
    ("bacterial diversity", Intent::DiversityInfo),
    ("diet recommendations", Intent::DietSuggestion),
    ("prebiotics", Intent::FiberInfo),
];

// Tokens are runs of two or more word characters.
// NOTE: expect() is acceptable here, the pattern is a literal.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("Invalid regex: token pattern"));

/// Lower-cases and splits text into terms.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Hyper-parameters of the gradient descent fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    /// Inverse L2 regularization strength
    pub c: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 500,
            learning_rate: 0.5,
            c: 1.0,
        }
    }
}

/// Smoothed TF-IDF vectorizer with L2-normalized output.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    /// Learns the vocabulary and IDF weights from the documents.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let mut seen: Vec<&String> = tokens.iter().collect();
            seen.sort();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (index, (term, df)) in document_frequency.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Self { vocabulary, idf }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// Dense TF-IDF vector of a text. Unknown terms are ignored; a text with
    /// no known terms maps to the zero vector.
    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0.0; self.idf.len()];
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                vector[index] += 1.0;
            }
        }
        for (value, idf) in vector.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

/// Most probable intent and its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub intent: Intent,
    pub probability: f32,
}

/// Statistical stage of the resolution cascade.
///
/// Implementations are fitted before use and read-only afterwards.
pub trait TextClassifier: Send + Sync {
    /// Best label for the text, or `None` when the model cannot score it.
    fn predict(&self, text: &str) -> Option<Prediction>;
}

/// TF-IDF + multinomial logistic regression over intent labels.
#[derive(Debug, Clone)]
pub struct IntentModel {
    vectorizer: TfIdfVectorizer,
    /// Classes ordered by label
    classes: Vec<Intent>,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl IntentModel {
    /// Fits the model on the versioned seed corpus.
    pub fn seeded(config: TrainingConfig) -> Result<Self, AppError> {
        Self::fit(SEED_CORPUS, config)
    }

    /// Fits the model on an arbitrary labeled corpus.
    pub fn fit(corpus: &[(&str, Intent)], config: TrainingConfig) -> Result<Self, AppError> {
        if corpus.is_empty() {
            return Err(AppError::Validation("training corpus is empty".to_string()));
        }
        if config.c <= 0.0 || config.learning_rate <= 0.0 {
            return Err(AppError::Config(
                "classifier learning rate and C must be positive".to_string(),
            ));
        }

        let texts: Vec<&str> = corpus.iter().map(|(text, _)| *text).collect();
        let vectorizer = TfIdfVectorizer::fit(&texts);
        if vectorizer.vocabulary_size() == 0 {
            return Err(AppError::Validation(
                "training corpus has no usable terms".to_string(),
            ));
        }

        let mut classes: Vec<Intent> = corpus.iter().map(|(_, intent)| *intent).collect();
        classes.sort_by_key(|intent| intent.label());
        classes.dedup();

        let features: Vec<Vec<f64>> = texts.iter().map(|t| vectorizer.transform(t)).collect();
        let targets: Vec<usize> = corpus
            .iter()
            .map(|(_, intent)| classes.iter().position(|c| c == intent).unwrap_or(0))
            .collect();

        let k = classes.len();
        let d = vectorizer.vocabulary_size();
        let n = features.len() as f64;
        let mut weights = vec![vec![0.0; d]; k];
        let mut bias = vec![0.0; k];

        for _ in 0..config.iterations {
            let mut grad_w = vec![vec![0.0; d]; k];
            let mut grad_b = vec![0.0; k];

            for (x, &y) in features.iter().zip(&targets) {
                let probs = softmax(&scores(&weights, &bias, x));
                for class in 0..k {
                    let err = probs[class] - if class == y { 1.0 } else { 0.0 };
                    grad_b[class] += err;
                    for (g, xi) in grad_w[class].iter_mut().zip(x) {
                        *g += err * xi;
                    }
                }
            }

            // Mean data loss plus ||W||^2 / (2 C n); the intercept is not penalized.
            for class in 0..k {
                for (w, g) in weights[class].iter_mut().zip(&grad_w[class]) {
                    let step = g / n + *w / (config.c * n);
                    *w -= config.learning_rate * step;
                }
                bias[class] -= config.learning_rate * grad_b[class] / n;
            }
        }

        info!(
            "Intent model fitted: {} classes, {} terms, {} samples",
            k,
            d,
            corpus.len()
        );

        Ok(Self {
            vectorizer,
            classes,
            weights,
            bias,
        })
    }

    pub fn classes(&self) -> &[Intent] {
        &self.classes
    }

    pub fn vectorizer(&self) -> &TfIdfVectorizer {
        &self.vectorizer
    }

    /// Probability of every class, in class order.
    pub fn probabilities(&self, text: &str) -> Vec<(Intent, f64)> {
        let x = self.vectorizer.transform(text);
        let probs = softmax(&scores(&self.weights, &self.bias, &x));
        self.classes.iter().copied().zip(probs).collect()
    }
}

impl TextClassifier for IntentModel {
    fn predict(&self, text: &str) -> Option<Prediction> {
        let mut best: Option<(Intent, f64)> = None;
        for (intent, p) in self.probabilities(text) {
            // Strict comparison keeps the first label on ties.
            if best.map_or(true, |(_, bp)| p > bp) {
                best = Some((intent, p));
            }
        }

        let (intent, probability) = best?;
        debug!(%intent, probability, "Statistical prediction");
        Some(Prediction {
            intent,
            probability: probability as f32,
        })
    }
}

fn scores(weights: &[Vec<f64>], bias: &[f64], x: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .zip(bias)
        .map(|(w, b)| w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>() + b)
        .collect()
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}
