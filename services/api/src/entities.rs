//! Entity extraction - recognizes states, crops and years in a question
//!
//! Vocabularies come from the loaded datasets, so only names that actually
//! occur in the data can be recognized.

use once_cell::sync::Lazy;
use parser::Datasets;
use regex::Regex;
use std::collections::BTreeSet;

/// Minimum similarity for a fuzzy state match
pub const FUZZY_CUTOFF: f64 = 0.8;
/// Tokens this short never take part in fuzzy matching
const MIN_TOKEN_CHARS: usize = 4;
/// A question names at most this many states
pub const MAX_STATES: usize = 2;

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex"));

/// String similarity in [0, 1]
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Levenshtein distance normalized by the longer string
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Never matches; turns fuzzy matching off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSimilarity;

impl Similarity for NoSimilarity {
    fn similarity(&self, _a: &str, _b: &str) -> f64 {
        0.0
    }
}

pub struct EntityExtractor {
    states: Vec<String>,
    crops: Vec<String>,
    similarity: Box<dyn Similarity>,
}

impl EntityExtractor {
    pub fn new(datasets: &Datasets, similarity: Box<dyn Similarity>) -> Self {
        let states: BTreeSet<&str> = datasets
            .agriculture
            .states()
            .into_iter()
            .chain(datasets.climate.states())
            .collect();

        Self {
            states: states.into_iter().map(str::to_string).collect(),
            crops: datasets
                .agriculture
                .crops()
                .into_iter()
                .map(str::to_string)
                .collect(),
            similarity,
        }
    }

    pub fn state_vocabulary(&self) -> &[String] {
        &self.states
    }

    /// Up to two states. Exact containment wins and is ordered by position in
    /// the question; fuzzy matching per token is only tried when nothing
    /// matched exactly.
    pub fn extract_states(&self, question: &str) -> Vec<String> {
        let upper = question.to_uppercase();

        let mut found = contained_in(&upper, &self.states);

        if found.is_empty() {
            for token in upper.split_whitespace() {
                let token = token.trim_matches(|c: char| c.is_ascii_punctuation());
                if token.chars().count() < MIN_TOKEN_CHARS {
                    continue;
                }
                if let Some(state) = self.closest_state(token) {
                    if !found.contains(&state) {
                        found.push(state);
                    }
                }
            }
        }

        found.truncate(MAX_STATES);
        found
    }

    /// Crops named verbatim in the question, in order of appearance
    pub fn extract_crops(&self, question: &str) -> Vec<String> {
        contained_in(&question.to_uppercase(), &self.crops)
    }

    fn closest_state(&self, token: &str) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for state in &self.states {
            let score = self.similarity.similarity(token, state);
            if score < FUZZY_CUTOFF {
                continue;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((state, score));
            }
        }
        best.map(|(state, _)| state.clone())
    }
}

/// Every 19xx / 20xx word, in order of appearance
pub fn extract_years(question: &str) -> Vec<i32> {
    YEAR_PATTERN
        .find_iter(question)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Vocabulary entries found in `haystack`, ordered by first position
fn contained_in(haystack: &str, vocabulary: &[String]) -> Vec<String> {
    let mut hits: Vec<(usize, &String)> = vocabulary
        .iter()
        .filter_map(|name| haystack.find(name.as_str()).map(|pos| (pos, name)))
        .collect();
    hits.sort();
    hits.into_iter().map(|(_, name)| name.clone()).collect()
}
