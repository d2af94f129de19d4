use tracing::debug;

use super::{ConceptQuery, ExtractionResult, Strategy};
use crate::parser::document::Document;

const BLOCK_TAGS: &[&str] = &["section", "div", "article", "aside", "p"];

/// Publishers that mark sections semantically: an `id` or a single class
/// naming both the primary key and "avail", e.g. `data-availability-section`.
pub struct Structural;

impl Strategy for Structural {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn find(&self, doc: &Document, query: &ConceptQuery) -> ExtractionResult {
        let Some(primary) = query.primary() else {
            return ExtractionResult::NotFound;
        };
        let primary = primary.to_lowercase();
        let names_section = |value: &str| {
            let value = value.to_lowercase();
            value.contains(&primary) && value.contains("avail")
        };

        let candidates = doc.find_all(BLOCK_TAGS, |n| {
            n.attr("id").is_some_and(names_section) || n.classes().into_iter().any(names_section)
        });
        for node in candidates {
            let found = ExtractionResult::from_text(&node.text("\n"));
            if found.is_found() {
                debug!(attrs = ?node.attributes(), "structural match");
                return found;
            }
        }
        ExtractionResult::NotFound
    }
}
