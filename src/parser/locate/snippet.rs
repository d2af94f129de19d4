use super::{availability_regex, ConceptQuery, ExtractionResult, Strategy};
use crate::parser::document::Document;

/// Characters kept after the heading phrase before looking for a boundary.
pub const MAX_SNIPPET_CHARS: usize = 2000;

/// Last resort: search the flattened page text for "<key> availability" and
/// keep what follows up to the next apparent section break.
pub struct FreeTextSnippet;

impl Strategy for FreeTextSnippet {
    fn name(&self) -> &'static str {
        "snippet"
    }

    fn find(&self, doc: &Document, query: &ConceptQuery) -> ExtractionResult {
        find_in_text(&doc.flatten(), query)
    }
}

pub fn find_in_text(text: &str, query: &ConceptQuery) -> ExtractionResult {
    let Some(re) = availability_regex(&query.keys, r"[:\s\-–—]*") else {
        return ExtractionResult::NotFound;
    };

    for m in re.find_iter(text) {
        let rest = &text[m.end()..];
        let window_end = rest
            .char_indices()
            .nth(MAX_SNIPPET_CHARS)
            .map_or(rest.len(), |(i, _)| i);
        let window = &rest[..window_end];
        let body = &window[..section_boundary(window, starts_fresh_line(m.as_str()))];
        if body.trim().is_empty() {
            continue;
        }
        return ExtractionResult::from_text(&format!("{}{}", m.as_str(), body));
    }
    ExtractionResult::NotFound
}

/// Whether the heading phrase ended its line, so the snippet opens on a
/// line of its own.
fn starts_fresh_line(heading: &str) -> bool {
    heading
        .trim_end_matches([' ', '\t', ':', '-', '–', '—'])
        .ends_with(['\n', '\r'])
}

/// Byte offset of the first blank line or of the first all-caps line,
/// whichever comes first. A line the heading sits on is never a boundary.
fn section_boundary(window: &str, fresh_line: bool) -> usize {
    let blank = window.find("\n\n").unwrap_or(window.len());

    let mut offset = 0;
    let mut caps = window.len();
    for (i, line) in window.split_inclusive('\n').enumerate() {
        if (fresh_line || i > 0) && is_caps_line(line.trim()) {
            caps = offset;
            break;
        }
        offset += line.len();
    }

    blank.min(caps)
}

fn is_caps_line(line: &str) -> bool {
    line.chars().count() >= 3
        && line.chars().any(char::is_alphabetic)
        && !line.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_query() -> ConceptQuery {
        ConceptQuery::new(&["data", "avail"])
    }

    #[test]
    fn cuts_at_blank_line_before_caps_heading() {
        let text = "Results were good.\n\nData Availability: All data are deposited in Zenodo.\n\nACKNOWLEDGEMENTS\nWe thank everyone.";
        assert_eq!(
            find_in_text(text, &data_query()).text(),
            Some("Data Availability: All data are deposited in Zenodo.")
        );
    }

    #[test]
    fn cuts_at_caps_line_without_blank_line() {
        let text = "Data availability\nCode and data on GitHub.\nSee release v1.\nREFERENCES\n[1] Smith";
        assert_eq!(
            find_in_text(text, &data_query()).text(),
            Some("Data availability\nCode and data on GitHub.\nSee release v1.")
        );
    }

    #[test]
    fn dash_separator_is_part_of_heading() {
        let text = "Data availability — Available on request.";
        assert_eq!(
            find_in_text(text, &data_query()).text(),
            Some("Data availability — Available on request.")
        );
    }

    #[test]
    fn snippet_capped_at_window() {
        let text = format!("Data availability: {}", "y".repeat(5000));
        let found = find_in_text(&text, &data_query());
        let kept = found.text().unwrap();
        assert!(kept.ends_with(&"y".repeat(MAX_SNIPPET_CHARS)));
        assert_eq!(
            kept.chars().count(),
            "Data availability: ".len() + MAX_SNIPPET_CHARS
        );
    }

    #[test]
    fn empty_hit_moves_to_next_occurrence() {
        let text = "Data availability\nREFERENCES\n\nData availability: Pangaea doi:10.1594/x";
        assert_eq!(
            find_in_text(text, &data_query()).text(),
            Some("Data availability: Pangaea doi:10.1594/x")
        );
    }

    #[test]
    fn caps_line_right_after_heading_is_a_boundary() {
        let text = "Data Availability:\nACKNOWLEDGEMENTS\nThanks.";
        assert_eq!(find_in_text(text, &data_query()), ExtractionResult::NotFound);
    }

    #[test]
    fn first_line_in_caps_is_kept() {
        let text = "DATA AVAILABILITY: NOT APPLICABLE\nNEXT SECTION";
        assert_eq!(
            find_in_text(text, &data_query()).text(),
            Some("DATA AVAILABILITY: NOT APPLICABLE")
        );
    }

    #[test]
    fn through_flattened_document() {
        let doc = Document::parse(
            "<div><p>Intro.</p>\n<div>Data Availability: see Zenodo record 123.</div>\n<div>ACKNOWLEDGEMENTS</div></div>",
        );
        let r = FreeTextSnippet.find(&doc, &data_query());
        assert_eq!(r.text(), Some("Data Availability: see Zenodo record 123."));
    }
}
