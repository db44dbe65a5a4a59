//! Keyword classifier: decides whether a message is about space, and which
//! data categories it implicates.
//!
//! Matching is case-insensitive over alphanumeric word tokens, so "Mars?"
//! matches `mars` but "marshmallow" does not. Multi-word terms such as
//! `space weather` match when their tokens appear contiguously. There is no
//! stemming: plural forms are listed as separate terms. Every matching
//! category is collected, never just the first.

use std::collections::BTreeSet;

use orbitchat_config::ClassifierConfig;
use orbitchat_core::data::DataCategory;
use orbitchat_core::message::Conversation;

/// Built-in trigger terms.
///
/// "weather" and "earth" are deliberately absent: on their own they say
/// nothing about space, and "mars weather" is already caught by "mars".
const BUILTIN: &[(&str, DataCategory)] = &[
    // General space vocabulary falls back to the picture of the day.
    ("space", DataCategory::Imagery),
    ("astronomy", DataCategory::Imagery),
    ("astronomer", DataCategory::Imagery),
    ("cosmos", DataCategory::Imagery),
    ("cosmic", DataCategory::Imagery),
    ("universe", DataCategory::Imagery),
    ("galaxy", DataCategory::Imagery),
    ("galaxies", DataCategory::Imagery),
    ("star", DataCategory::Imagery),
    ("stars", DataCategory::Imagery),
    ("nebula", DataCategory::Imagery),
    ("telescope", DataCategory::Imagery),
    ("planet", DataCategory::Imagery),
    ("planets", DataCategory::Imagery),
    ("moon", DataCategory::Imagery),
    ("nasa", DataCategory::Imagery),
    ("apod", DataCategory::Imagery),
    ("asteroid", DataCategory::NearEarthObjects),
    ("asteroids", DataCategory::NearEarthObjects),
    ("comet", DataCategory::NearEarthObjects),
    ("comets", DataCategory::NearEarthObjects),
    ("meteor", DataCategory::NearEarthObjects),
    ("meteors", DataCategory::NearEarthObjects),
    ("neo", DataCategory::NearEarthObjects),
    ("near earth", DataCategory::NearEarthObjects),
    ("orbit", DataCategory::NearEarthObjects),
    ("mars", DataCategory::MarsWeather),
    ("martian", DataCategory::MarsWeather),
    ("insight", DataCategory::MarsWeather),
    ("space weather", DataCategory::SpaceWeather),
    ("solar", DataCategory::SpaceWeather),
    ("sun", DataCategory::SpaceWeather),
    ("flare", DataCategory::SpaceWeather),
    ("flares", DataCategory::SpaceWeather),
    ("geomagnetic", DataCategory::SpaceWeather),
    ("aurora", DataCategory::SpaceWeather),
    ("cme", DataCategory::SpaceWeather),
    ("satellite", DataCategory::EarthImagery),
    ("satellites", DataCategory::EarthImagery),
    ("imagery", DataCategory::EarthImagery),
    ("landsat", DataCategory::EarthImagery),
];

#[derive(Debug, Clone)]
struct Term {
    text: String,
    tokens: Vec<String>,
    category: DataCategory,
}

/// An injectable list of trigger terms, each mapped to one category.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<Term>,
}

/// What the classifier found in one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Matched terms, in vocabulary order, without duplicates.
    pub matched_terms: Vec<String>,
    /// Implicated categories, in declaration order.
    pub categories: BTreeSet<DataCategory>,
}

impl Classification {
    pub fn is_space_related(&self) -> bool {
        !self.categories.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Vocabulary {
    pub fn new<S: AsRef<str>>(entries: impl IntoIterator<Item = (S, DataCategory)>) -> Self {
        let terms = entries
            .into_iter()
            .filter_map(|(text, category)| {
                let tokens = tokenize(text.as_ref());
                if tokens.is_empty() {
                    return None;
                }
                Some(Term {
                    text: tokens.join(" "),
                    tokens,
                    category,
                })
            })
            .collect();
        Self { terms }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN.iter().copied())
    }

    /// The configured vocabulary, or the built-in one when none is set.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        match &config.vocabulary {
            Some(entries) => Self::new(entries.iter().map(|e| (e.term.as_str(), e.category))),
            None => Self::builtin(),
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Classify a single message text.
    pub fn classify(&self, message: &str) -> Classification {
        let tokens = tokenize(message);
        let mut result = Classification::default();
        if tokens.is_empty() {
            return result;
        }

        for term in &self.terms {
            let hit = tokens
                .windows(term.tokens.len())
                .any(|w| w == term.tokens.as_slice());
            if hit {
                result.categories.insert(term.category);
                if !result.matched_terms.contains(&term.text) {
                    result.matched_terms.push(term.text.clone());
                }
            }
        }
        result
    }

    /// Classify the most recent user message of a conversation.
    pub fn classify_conversation(&self, conversation: &Conversation) -> Classification {
        conversation
            .latest_user_message()
            .map(|m| self.classify(m))
            .unwrap_or_default()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
