pub mod heading;
pub mod meta;
pub mod snippet;
pub mod structural;
pub mod titled;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::document::Document;

/// Outcome of a section search. Never partially populated.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Found(String),
    NotFound,
}

impl ExtractionResult {
    /// Trimmed text becomes `Found`, blank text `NotFound`.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            ExtractionResult::NotFound
        } else {
            ExtractionResult::Found(trimmed.to_string())
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionResult::Found(t) => Some(t),
            ExtractionResult::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ExtractionResult::Found(_))
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            ExtractionResult::Found(t) => Some(t),
            ExtractionResult::NotFound => None,
        }
    }
}

/// What to look for: synonym keys, plus the content keys for a meta search.
/// An empty `meta_keys` means the caller did not ask for one.
#[derive(Debug, Clone, Default)]
pub struct ConceptQuery {
    pub keys: Vec<String>,
    pub meta_keys: Vec<String>,
}

impl ConceptQuery {
    pub fn new(keys: &[&str]) -> Self {
        ConceptQuery {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            meta_keys: Vec::new(),
        }
    }

    pub fn with_meta(mut self, meta_keys: &[&str]) -> Self {
        self.meta_keys = meta_keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn primary(&self) -> Option<&str> {
        self.keys.first().map(String::as_str).filter(|k| !k.is_empty())
    }
}

/// One heuristic of the cascade.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn find(&self, doc: &Document, query: &ConceptQuery) -> ExtractionResult;
}

/// A located section together with the strategy that produced it.
#[derive(Debug, Clone)]
pub struct Hit {
    pub strategy: &'static str,
    pub text: String,
}

/// Cascade of strategies ordered from most structural to most desperate.
/// The first one to produce text wins; nothing is merged across stages.
pub struct Locator {
    strategies: Vec<Box<dyn Strategy>>,
    titled: titled::TitleRanked,
}

impl Default for Locator {
    fn default() -> Self {
        Locator {
            strategies: vec![
                Box::new(structural::Structural),
                Box::new(heading::HeadingAnchored),
                Box::new(meta::MetaTag),
                Box::new(snippet::FreeTextSnippet),
            ],
            titled: titled::TitleRanked,
        }
    }
}

impl Locator {
    /// Structural, heading-anchored and free-text stages.
    pub fn locate(&self, doc: &Document, keys: &[&str]) -> ExtractionResult {
        self.run(doc, &ConceptQuery::new(keys))
    }

    /// Full cascade, with the meta-tag stage scored against `meta_keys`.
    /// With no `keys`, only the meta-tag stage can fire.
    pub fn locate_with_meta(
        &self,
        doc: &Document,
        keys: &[&str],
        meta_keys: &[&str],
    ) -> ExtractionResult {
        self.run(doc, &ConceptQuery::new(keys).with_meta(meta_keys))
    }

    /// Highest-scoring `section[data-title]` for title keywords.
    pub fn locate_titled(&self, doc: &Document, title_keys: &[&str]) -> ExtractionResult {
        self.titled.find(doc, &ConceptQuery::new(title_keys))
    }

    pub fn run(&self, doc: &Document, query: &ConceptQuery) -> ExtractionResult {
        match self.trace(doc, query) {
            Some(hit) => ExtractionResult::Found(hit.text),
            None => ExtractionResult::NotFound,
        }
    }

    pub fn trace(&self, doc: &Document, query: &ConceptQuery) -> Option<Hit> {
        for strategy in &self.strategies {
            if let ExtractionResult::Found(text) = strategy.find(doc, query) {
                debug!(strategy = strategy.name(), keys = ?query.keys, "section located");
                return Some(Hit {
                    strategy: strategy.name(),
                    text,
                });
            }
        }
        None
    }

    pub fn trace_with_meta(
        &self,
        doc: &Document,
        keys: &[&str],
        meta_keys: &[&str],
    ) -> Option<Hit> {
        self.trace(doc, &ConceptQuery::new(keys).with_meta(meta_keys))
    }

    pub fn trace_titled(&self, doc: &Document, title_keys: &[&str]) -> Option<Hit> {
        self.locate_titled(doc, title_keys).into_option().map(|text| Hit {
            strategy: self.titled.name(),
            text,
        })
    }
}

/// Case-insensitive regex for a caller key. Keys are regex fragments; one
/// that does not compile is matched literally instead.
pub(crate) fn key_regex(key: &str) -> Option<Regex> {
    RegexBuilder::new(key)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&regex::escape(key))
                .case_insensitive(true)
                .build()
        })
        .ok()
}

/// `(?:k1|k2|..)\s+availability<suffix>` over the literal keys.
pub(crate) fn availability_regex(keys: &[String], suffix: &str) -> Option<Regex> {
    let alternatives: Vec<String> = keys
        .iter()
        .filter(|k| !k.is_empty())
        .map(|k| regex::escape(k))
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    let pattern = format!(
        r"(?i)(?:{})\s+availability{}",
        alternatives.join("|"),
        suffix
    );
    Regex::new(&pattern).ok()
}

// ── Tests ──
