pub mod discipline;
pub mod taxonomy;

use serde::Serialize;

use crate::parser::locate::ExtractionResult;
use taxonomy::Taxonomy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: f64,
    pub category: String,
}

impl ScoreResult {
    fn empty(empty_category: &str) -> Self {
        ScoreResult {
            score: 0.0,
            category: empty_category.to_string(),
        }
    }
}

/// Best single signal: the largest weight among matching entries, labelled
/// with the category of the first entry that reaches it. Weights are never
/// summed. Missing text, or no positive match, is `(0, empty_category)`.
pub fn score(text: Option<&str>, taxonomy: &Taxonomy, empty_category: &str) -> ScoreResult {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return ScoreResult::empty(empty_category);
    };

    let mut best: Option<(f64, Option<&str>)> = None;
    for entry in taxonomy.entries() {
        if entry.weight <= 0.0 || !entry.is_match(text) {
            continue;
        }
        if best.map_or(true, |(weight, _)| entry.weight > weight) {
            best = Some((entry.weight, entry.category.as_deref()));
        }
    }

    match best {
        Some((weight, category)) => ScoreResult {
            score: weight,
            category: category.unwrap_or_default().to_string(),
        },
        None => ScoreResult::empty(empty_category),
    }
}

/// A taxonomy bound to the label reported when nothing matches.
#[derive(Debug, Clone)]
pub struct Scorer {
    taxonomy: Taxonomy,
    empty_category: String,
}

impl Scorer {
    pub fn new(taxonomy: Taxonomy, empty_category: &str) -> Self {
        Scorer {
            taxonomy,
            empty_category: empty_category.to_string(),
        }
    }

    pub fn score(&self, section: &ExtractionResult) -> ScoreResult {
        self.score_text(section.text())
    }

    pub fn score_text(&self, text: Option<&str>) -> ScoreResult {
        score(text, &self.taxonomy, &self.empty_category)
    }
}

// ── Tests ──
