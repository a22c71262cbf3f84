//! Named-entity extraction for chat messages.
//!
//! Known gut-health terms are typed from a small gazetteer. Any other run of
//! capitalized words that does not open a sentence is reported as a proper
//! noun.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?u)\b\w[\w'-]*").expect("Invalid regex: word pattern"));

/// Entity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Taxon,
    Food,
    Condition,
    ProperNoun,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityType::Taxon => "TAXON",
            EntityType::Food => "FOOD",
            EntityType::Condition => "CONDITION",
            EntityType::ProperNoun => "PROPER_NOUN",
        };
        f.write_str(label)
    }
}

/// A named entity as written in the message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl Entity {
    fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
        }
    }
}

pub struct EntityExtractor {
    gazetteer: HashMap<&'static str, EntityType>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor {
    pub fn new() -> Self {
        let mut gazetteer = HashMap::new();

        for term in [
            "bifidobacterium",
            "lactobacillus",
            "firmicutes",
            "bacteroidetes",
            "akkermansia",
            "prevotella",
            "faecalibacterium",
            "bacteroides",
        ] {
            gazetteer.insert(term, EntityType::Taxon);
        }

        for term in [
            "kefir",
            "kimchi",
            "yogurt",
            "yoghurt",
            "sauerkraut",
            "kombucha",
            "miso",
            "tempeh",
            "oats",
            "lentils",
            "beans",
            "garlic",
            "onions",
            "bananas",
            "inulin",
        ] {
            gazetteer.insert(term, EntityType::Food);
        }

        for term in [
            "ibs",
            "bloating",
            "constipation",
            "diarrhea",
            "inflammation",
            "dysbiosis",
            "reflux",
        ] {
            gazetteer.insert(term, EntityType::Condition);
        }

        Self { gazetteer }
    }

    /// Entities in first-occurrence order, each name reported once.
    pub fn extract(&self, text: &str) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut seen = HashSet::new();
        let mut span: Vec<&str> = Vec::new();
        let mut last_end = 0;

        let mut push = |entities: &mut Vec<Entity>, entity: Entity| {
            if seen.insert(entity.name.to_lowercase()) {
                entities.push(entity);
            }
        };

        for word in WORD_PATTERN.find_iter(text) {
            let gap = &text[last_end..word.start()];
            let sentence_start = last_end == 0 || gap.contains(['.', '!', '?']);
            let adjacent = !span.is_empty() && gap.chars().all(char::is_whitespace);
            last_end = word.end();

            if let Some(kind) = self.gazetteer.get(word.as_str().to_lowercase().as_str()) {
                flush(&mut span, &mut entities, &mut push);
                push(&mut entities, Entity::new(word.as_str(), *kind));
                continue;
            }

            if !is_capitalized(word.as_str()) || sentence_start {
                flush(&mut span, &mut entities, &mut push);
                continue;
            }

            if !adjacent {
                flush(&mut span, &mut entities, &mut push);
            }
            span.push(word.as_str());
        }
        flush(&mut span, &mut entities, &mut push);

        entities
    }
}

fn is_capitalized(word: &str) -> bool {
    word.chars().count() > 1 && word.chars().next().is_some_and(char::is_uppercase)
}

fn flush<F>(span: &mut Vec<&str>, entities: &mut Vec<Entity>, push: &mut F)
where
    F: FnMut(&mut Vec<Entity>, Entity),
{
    if !span.is_empty() {
        push(entities, Entity::new(span.join(" "), EntityType::ProperNoun));
        span.clear();
    }
}
