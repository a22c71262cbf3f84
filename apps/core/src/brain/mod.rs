//! # Brain Module
//!
//! Message understanding and reply composition for GutChat.
//!
//! ## Components
//! - `intent`: Intent vocabulary and resolution results
//! - `rules`: Priority-ordered keyword rules (fast path)
//! - `classifier`: TF-IDF + logistic regression over the seed corpus
//! - `resolver`: Learned → rules → classifier → fallback cascade
//! - `composer`: Template replies and diet recommendations
//! - `keywords`: Content keyword extraction
//! - `entities`: Typed named entities (gut-health terms and proper nouns)

pub mod classifier;
pub mod composer;
pub mod entities;
pub mod intent;
pub mod keywords;
pub mod resolver;
pub mod rules;

pub use classifier::{IntentModel, Prediction, TextClassifier, TrainingConfig};
pub use composer::ResponseComposer;
pub use entities::{Entity, EntityExtractor, EntityType};
pub use intent::{Intent, IntentResult, Method};
pub use keywords::KeywordExtractor;
pub use resolver::IntentResolver;
pub use rules::RuleMatcher;
