//! Learned overrides from user feedback.
//!
//! A correction pins a message text (trimmed, lower-cased) to an intent or to
//! a verbatim response. The store is the only mutable state of the core and is
//! shared as `Arc<LearningStore>`; one mutex serializes every read and write.

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::brain::intent::Intent;

/// Stored correction for one normalized message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedOverride {
    /// Pinned intent; [`Intent::Custom`] when a verbatim response was stored.
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A persisted entry, as handed to and from the caller's storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedEntry {
    pub key: String,
    #[serde(flatten)]
    pub value: LearnedOverride,
}

/// Display statistics of the learning store.
///
/// `intent_accuracy` and `personalization_score` are presentation heuristics
/// derived from the entry count, not measured accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_learned: usize,
    pub custom_responses: usize,
    pub intent_accuracy: usize,
    pub personalization_score: usize,
}

impl LearningStats {
    fn from_counts(total_learned: usize, custom_responses: usize) -> Self {
        Self {
            total_learned,
            custom_responses,
            intent_accuracy: 95.min(85 + 2 * total_learned),
            personalization_score: 95.min(70 + 3 * total_learned),
        }
    }
}

/// Normalizes message text into a store key.
pub fn normalize_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Thread-safe map of learned overrides.
///
/// Unbounded by default; with a capacity the least recently used key is
/// evicted once the bound is reached.
pub struct LearningStore {
    entries: Mutex<LruCache<String, LearnedOverride>>,
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Creates a store holding at most `capacity` entries.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, LearnedOverride>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a correction for `text`.
    ///
    /// A non-empty custom response wins over a label. When neither is given the
    /// call is a no-op that still reports success.
    pub fn update(
        &self,
        text: &str,
        custom_response: Option<&str>,
        intent_label: Option<Intent>,
    ) -> bool {
        let key = normalize_key(text);
        let custom_response = custom_response.filter(|r| !r.is_empty());

        let value = match (custom_response, intent_label) {
            (Some(response), _) => LearnedOverride {
                intent: Intent::Custom,
                response: Some(response.to_string()),
                timestamp: Utc::now(),
            },
            (None, Some(intent)) => LearnedOverride {
                intent,
                response: None,
                timestamp: Utc::now(),
            },
            (None, None) => {
                debug!(key = %key, "Feedback carried neither response nor label, nothing learned");
                return true;
            }
        };

        info!(key = %key, intent = %value.intent, "Learned override recorded");
        self.lock().put(key, value);
        true
    }

    /// Looks up the override for a message text.
    pub fn lookup(&self, text: &str) -> Option<LearnedOverride> {
        self.lock().get(&normalize_key(text)).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> LearningStats {
        let entries = self.lock();
        let custom = entries
            .iter()
            .filter(|(_, v)| v.intent == Intent::Custom)
            .count();
        LearningStats::from_counts(entries.len(), custom)
    }

    /// Copies every entry out for persistence, most recently used first.
    pub fn snapshot(&self) -> Vec<LearnedEntry> {
        self.lock()
            .iter()
            .map(|(key, value)| LearnedEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Loads previously persisted entries. Keys are re-normalized and later
    /// entries overwrite earlier ones.
    pub fn restore(&self, entries: impl IntoIterator<Item = LearnedEntry>) -> usize {
        let mut guard = self.lock();
        let mut loaded = 0;
        for entry in entries {
            guard.put(normalize_key(&entry.key), entry.value);
            loaded += 1;
        }
        info!("Restored {} learned overrides", loaded);
        loaded
    }
}
