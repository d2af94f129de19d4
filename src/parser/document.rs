use std::collections::BTreeMap;

use scraper::{ElementRef, Html};

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Subtrees whose text never belongs to the readable page.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// A parsed page. Built once per record, read-only afterwards.
pub struct Document {
    html: Html,
}

/// A position in the tree: an element, or a bare text run between elements.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
}

impl Document {
    /// Parse raw markup. Never fails: html5ever recovers from malformed input.
    pub fn parse(raw: &str) -> Self {
        Document {
            html: Html::parse_document(raw),
        }
    }

    /// All elements whose tag is in `tags` (any tag when empty) and that pass
    /// `filter`, in document order.
    pub fn find_all<F>(&self, tags: &[&str], filter: F) -> Vec<Node<'_>>
    where
        F: Fn(&Node<'_>) -> bool,
    {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| tags.is_empty() || tags.contains(&el.value().name()))
            .map(Node::Element)
            .filter(|n| filter(n))
            .collect()
    }

    /// The whole page as plain text: raw text runs joined with newlines, so
    /// whitespace between blocks survives as blank lines.
    pub fn flatten(&self) -> String {
        let mut parts = Vec::new();
        collect_text(self.html.root_element(), &mut parts);
        parts.join("\n")
    }

    pub fn html(&self) -> String {
        self.html.html()
    }
}

impl<'a> Node<'a> {
    pub fn tag(&self) -> Option<&'a str> {
        match self {
            Node::Element(el) => Some(el.value().name()),
            Node::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match self {
            Node::Element(el) => el.value().attr(name),
            Node::Text(_) => None,
        }
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        match self {
            Node::Element(el) => el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Node::Text(_) => BTreeMap::new(),
        }
    }

    pub fn classes(&self) -> Vec<&'a str> {
        match self {
            Node::Element(el) => el.value().classes().collect(),
            Node::Text(_) => Vec::new(),
        }
    }

    pub fn is_heading(&self) -> bool {
        self.tag().is_some_and(|t| HEADING_TAGS.contains(&t))
    }

    /// Text content: every text run trimmed, blanks dropped, joined with `sep`.
    pub fn text(&self, sep: &str) -> String {
        match self {
            Node::Element(el) => {
                let mut parts = Vec::new();
                collect_text(*el, &mut parts);
                parts
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join(sep)
            }
            Node::Text(t) => t.trim().to_string(),
        }
    }

    /// Following siblings in order. Whitespace-only text runs are skipped.
    pub fn next_siblings(&self) -> Vec<Node<'a>> {
        let Node::Element(el) = self else {
            return Vec::new();
        };
        el.next_siblings()
            .filter_map(|sib| match sib.value() {
                scraper::Node::Element(_) => ElementRef::wrap(sib).map(Node::Element),
                scraper::Node::Text(t) if !t.trim().is_empty() => Some(Node::Text(&**t)),
                _ => None,
            })
            .collect()
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        match self {
            Node::Element(el) => el.parent().and_then(ElementRef::wrap).map(Node::Element),
            Node::Text(_) => None,
        }
    }

    /// Descendant elements (excluding self) whose tag is in `tags`.
    pub fn descendants(&self, tags: &[&str]) -> Vec<Node<'a>> {
        let Node::Element(el) = self else {
            return Vec::new();
        };
        el.descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|d| tags.is_empty() || tags.contains(&d.value().name()))
            .map(Node::Element)
            .collect()
    }
}

fn collect_text<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        match child.value() {
            scraper::Node::Text(t) => out.push(&**t),
            scraper::Node::Element(e) if !SKIPPED_TAGS.contains(&e.name()) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_markup_still_parses() {
        let doc = Document::parse("<div><p>unclosed <b>bold</div><span>tail");
        let ps = doc.find_all(&["p"], |_| true);
        assert_eq!(ps.len(), 1);
        assert!(ps[0].text(" ").contains("bold"));
        assert!(doc.flatten().contains("tail"));
    }

    #[test]
    fn find_all_filters_by_tag_and_attribute() {
        let doc = Document::parse(
            r#"<div id="a">one</div><section id="b">two</section><div class="x y">three</div>"#,
        );
        let divs = doc.find_all(&["div"], |_| true);
        assert_eq!(divs.len(), 2);
        let with_class = doc.find_all(&[], |n| n.classes().contains(&"y"));
        assert_eq!(with_class.len(), 1);
        assert_eq!(with_class[0].text(""), "three");
        assert_eq!(with_class[0].attributes().get("class").map(String::as_str), Some("x y"));
    }

    #[test]
    fn text_trims_fragments_and_skips_scripts() {
        let doc = Document::parse(
            "<div id=\"t\">\n  <h2> Title </h2>\n  <script>var x = 1;</script>\n  <p>Body text</p>\n</div>",
        );
        let div = &doc.find_all(&["div"], |n| n.attr("id") == Some("t"))[0];
        assert_eq!(div.text("\n"), "Title\nBody text");
        assert!(!doc.flatten().contains("var x"));
    }

    #[test]
    fn next_siblings_include_text_runs() {
        let doc = Document::parse("<p><b>Heading</b> trailing words <i>more</i></p>");
        let b = &doc.find_all(&["b"], |_| true)[0];
        let sibs = b.next_siblings();
        assert_eq!(sibs.len(), 2);
        assert!(matches!(sibs[0], Node::Text(t) if t.trim() == "trailing words"));
        assert_eq!(sibs[1].tag(), Some("i"));
    }

    #[test]
    fn heading_detection() {
        let doc = Document::parse("<h3>a</h3><p>b</p>");
        assert!(doc.find_all(&["h3"], |_| true)[0].is_heading());
        assert!(!doc.find_all(&["p"], |_| true)[0].is_heading());
        assert!(!Node::Text("x").is_heading());
    }

    #[test]
    fn flatten_keeps_block_breaks() {
        let doc = Document::parse("<body>\n<p>first</p>\n\n<p>second</p>\n</body>");
        let flat = doc.flatten();
        assert!(flat.contains("first\n\n"));
    }
}
