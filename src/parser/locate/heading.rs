use regex::Regex;

use super::{availability_regex, ConceptQuery, ExtractionResult, Strategy};
use crate::parser::document::{Document, Node};

/// Tags that publishers dress up as section headings.
const ANCHOR_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "b", "strong", "em", "dt", "div", "span", "section",
];

/// Ceiling on collected text, in characters.
pub const MAX_SECTION_CHARS: usize = 4000;

/// A literal "<key> availability" heading, followed by its sibling content up
/// to the next heading.
pub struct HeadingAnchored;

impl Strategy for HeadingAnchored {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn find(&self, doc: &Document, query: &ConceptQuery) -> ExtractionResult {
        let Some(re) = availability_regex(&query.keys, "") else {
            return ExtractionResult::NotFound;
        };
        let matches = |n: &Node<'_>| re.is_match(&n.text(" "));

        // A bare heading only counts when no later anchor carries a body.
        let mut bare: Option<String> = None;
        for candidate in doc.find_all(ANCHOR_TAGS, matches) {
            // Wrappers match too; only the innermost element is an anchor.
            if candidate.descendants(ANCHOR_TAGS).iter().any(matches) {
                continue;
            }
            let anchor = widen(candidate);
            let text = collect_section(&anchor);
            if has_body(&re, &text) {
                return ExtractionResult::from_text(&text);
            }
            if bare.is_none() {
                bare = Some(anchor.text("\n"));
            }
        }
        bare.map_or(ExtractionResult::NotFound, |text| ExtractionResult::from_text(&text))
    }
}

/// Climb through ancestors that add no text of their own, so that
/// `<h2><span>Data availability</span></h2>` anchors on the `h2`.
fn widen(node: Node<'_>) -> Node<'_> {
    let own = node.text(" ");
    let mut anchor = node;
    while let Some(parent) = anchor.parent() {
        if parent.text(" ") != own {
            break;
        }
        anchor = parent;
    }
    anchor
}

fn collect_section(anchor: &Node<'_>) -> String {
    let mut out = anchor.text("\n");
    let mut len = out.chars().count();
    for sibling in anchor.next_siblings() {
        if sibling.is_heading() {
            break;
        }
        let text = sibling.text("\n");
        if text.is_empty() {
            continue;
        }
        let added = text.chars().count() + 1;
        if len + added > MAX_SECTION_CHARS {
            break;
        }
        out.push('\n');
        out.push_str(&text);
        len += added;
    }
    out
}

/// A bare heading (a table-of-contents entry, say) carries no section.
fn has_body(re: &Regex, text: &str) -> bool {
    re.replace_all(text, "")
        .chars()
        .any(|c| c.is_alphanumeric())
}
