//! Keyword extraction for chat messages.
//!
//! Scores content words by term frequency weighted with an approximate IDF.
//! Gut-health vocabulary (microbes, foods, symptoms) carries pre-computed
//! weights so it outranks generic words of similar length.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Stopwords for English
const STOPWORDS_EN: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "nor", "for", "yet", "so", "i", "you", "he", "she", "it",
    "we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
    "mine", "yours", "hers", "ours", "theirs", "this", "that", "these", "those", "who", "whom",
    "which", "what", "whose", "is", "am", "are", "was", "were", "be", "been", "being", "have",
    "has", "had", "having", "do", "does", "did", "doing", "will", "would", "shall", "should",
    "can", "could", "may", "might", "must", "in", "on", "at", "to", "from", "by", "with", "about",
    "against", "between", "into", "through", "during", "before", "after", "above", "below", "up",
    "down", "out", "off", "over", "under", "again", "further", "here", "there", "where", "when",
    "why", "how", "all", "each", "every", "both", "few", "more", "most", "other", "some", "any",
    "no", "not", "only", "own", "same", "than", "too", "very", "just", "also", "now", "then",
    "once", "always", "never", "if", "because", "as", "until", "while", "although", "though",
    "yes", "maybe", "tell", "need", "want", "please", "get", "help", "know", "like", "take",
];

/// Maximum number of keywords returned by default
const DEFAULT_MAX_KEYWORDS: usize = 5;

/// Result of keyword extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordResult {
    /// The keyword
    pub keyword: String,
    /// TF-IDF score
    pub score: f32,
    /// Raw frequency in the text
    pub frequency: usize,
}

/// Keyword extractor using TF-IDF
pub struct KeywordExtractor {
    stopwords: HashSet<&'static str>,
    min_word_length: usize,
    max_keywords: usize,
    /// IDF approximation for domain terms
    idf_weights: HashMap<&'static str, f32>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordExtractor {
    /// Create a new keyword extractor with default settings
    pub fn new() -> Self {
        Self::with_config(3, DEFAULT_MAX_KEYWORDS)
    }

    /// Create a keyword extractor with custom configuration
    pub fn with_config(min_word_length: usize, max_keywords: usize) -> Self {
        let stopwords: HashSet<&'static str> = STOPWORDS_EN.iter().copied().collect();

        let mut idf_weights = HashMap::new();

        // Microbes (high IDF)
        for term in [
            "bifidobacterium",
            "lactobacillus",
            "firmicutes",
            "bacteroidetes",
            "akkermansia",
            "microbiome",
        ] {
            idf_weights.insert(term, 3.0);
        }

        // Foods and supplements
        for term in [
            "probiotic", "probiotics", "prebiotic", "prebiotics", "kimchi", "kefir", "yogurt",
            "fiber", "fermented", "oats", "lentils",
        ] {
            idf_weights.insert(term, 2.5);
        }

        // Symptoms and measures
        for term in [
            "bloating", "digestion", "diversity", "shannon", "inflammation", "immunity", "gut",
        ] {
            idf_weights.insert(term, 2.0);
        }

        Self {
            stopwords,
            min_word_length,
            max_keywords,
            idf_weights,
        }
    }

    fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Tokenize text into lower-cased content words
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .map(|word| word.trim_matches('-'))
            .filter(|w| {
                w.chars().count() >= self.min_word_length
                    && !self.is_stopword(w)
                    && !w.chars().all(|c| c.is_numeric())
            })
            .map(|s| s.to_string())
            .collect()
    }

    /// Get IDF weight for a word (approximated)
    fn get_idf(&self, word: &str) -> f32 {
        if let Some(&weight) = self.idf_weights.get(word) {
            return weight;
        }

        // Longer words tend to be more specific
        let length_factor = (word.chars().count() as f32 / 6.0).min(1.5);
        1.0 + length_factor
    }

    /// Extract the top N keywords from text.
    ///
    /// Ties keep the order in which words first appear.
    pub fn extract(&self, text: &str, top_k: Option<usize>) -> Vec<KeywordResult> {
        let max_results = top_k.unwrap_or(self.max_keywords);
        let words = self.tokenize(text);

        if words.is_empty() {
            return vec![];
        }

        let total_words = words.len() as f32;
        let mut order: Vec<String> = Vec::new();
        let mut freq: HashMap<String, usize> = HashMap::new();
        for word in &words {
            let count = freq.entry(word.clone()).or_insert(0);
            if *count == 0 {
                order.push(word.clone());
            }
            *count += 1;
        }

        let mut scored: Vec<KeywordResult> = order
            .into_iter()
            .map(|word| {
                let frequency = freq.get(&word).copied().unwrap_or(0);
                let tf = frequency as f32 / total_words;
                KeywordResult {
                    score: tf * self.get_idf(&word),
                    keyword: word,
                    frequency,
                }
            })
            .collect();

        // Stable sort keeps first-occurrence order among equal scores.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        scored.into_iter().take(max_results).collect()
    }

    /// Extract keywords and return just the strings
    pub fn extract_keywords(&self, text: &str, top_k: Option<usize>) -> Vec<String> {
        self.extract(text, top_k)
            .into_iter()
            .map(|k| k.keyword)
            .collect()
    }
}
