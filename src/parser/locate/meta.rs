use regex::Regex;

use super::{key_regex, ConceptQuery, ExtractionResult, Strategy};
use crate::parser::document::Document;

/// `<meta content="...">` scored by how many content keys it mentions.
/// Only runs when the query carries meta keys.
pub struct MetaTag;

impl Strategy for MetaTag {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn find(&self, doc: &Document, query: &ConceptQuery) -> ExtractionResult {
        if query.meta_keys.is_empty() {
            return ExtractionResult::NotFound;
        }
        let regexes: Vec<Regex> = query.meta_keys.iter().filter_map(|k| key_regex(k)).collect();

        let mut best: Option<(usize, &str)> = None;
        for meta in doc.find_all(&["meta"], |_| true) {
            let content = meta.attr("content").unwrap_or("");
            let hits = regexes.iter().filter(|re| re.is_match(content)).count();
            // Strictly greater: the first tag keeps a tie.
            if hits > 0 && best.map_or(true, |(score, _)| hits > score) {
                best = Some((hits, content));
            }
        }

        match best {
            Some((_, content)) => ExtractionResult::from_text(content),
            None => ExtractionResult::NotFound,
        }
    }
}
