use regex::Regex;

use super::{key_regex, ConceptQuery, ExtractionResult, Strategy};
use crate::parser::document::{Document, Node};

const TITLE_ATTR: &str = "data-title";

/// Sections that carry their title as an attribute (`<section data-title>`),
/// ranked by how many title keywords match it.
pub struct TitleRanked;

impl Strategy for TitleRanked {
    fn name(&self) -> &'static str {
        "titled"
    }

    fn find(&self, doc: &Document, query: &ConceptQuery) -> ExtractionResult {
        let regexes: Vec<Regex> = query.keys.iter().filter_map(|k| key_regex(k)).collect();

        let mut best: Option<(usize, Node<'_>)> = None;
        for section in titled_sections(doc) {
            let title = section.attr(TITLE_ATTR).unwrap_or("");
            let hits = regexes.iter().filter(|re| re.is_match(title)).count();
            if hits > 0 && best.map_or(true, |(score, _)| hits > score) {
                best = Some((hits, section));
            }
        }

        match best {
            Some((_, section)) => ExtractionResult::from_text(&section.text("\n")),
            None => ExtractionResult::NotFound,
        }
    }
}

/// Every `data-title` in document order.
pub fn section_titles(doc: &Document) -> Vec<String> {
    titled_sections(doc)
        .iter()
        .filter_map(|s| s.attr(TITLE_ATTR))
        .map(str::to_string)
        .collect()
}

fn titled_sections(doc: &Document) -> Vec<Node<'_>> {
    doc.find_all(&["section"], |n| n.attr(TITLE_ATTR).is_some())
}
