use std::collections::HashMap;

use super::taxonomy::Taxonomy;

pub const UNDETERMINED: &str = "undetermined";

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordCount {
    pub keyword: String,
    pub category: Option<String>,
    pub keyword_count: usize,
    /// Sum over every keyword sharing this entry's category, repeated on each
    /// member; 0 for uncategorized entries.
    pub category_count: usize,
}

/// Per-entry match counts of `taxonomy` in `text`. `category_count` is left
/// at 0; see [`aggregate_categories`].
pub fn count_occurrences(text: &str, taxonomy: &Taxonomy) -> Vec<KeywordCount> {
    taxonomy
        .entries()
        .iter()
        .map(|entry| KeywordCount {
            keyword: entry.pattern.clone(),
            category: entry.category.clone(),
            keyword_count: entry.count(text),
            category_count: 0,
        })
        .collect()
}

/// Category strength: every member of a category gets the category total,
/// not its own count.
pub fn aggregate_categories(counts: &mut [KeywordCount]) {
    let mut totals: HashMap<String, usize> = HashMap::new();
    for c in counts.iter() {
        if let Some(cat) = &c.category {
            *totals.entry(cat.clone()).or_default() += c.keyword_count;
        }
    }
    for c in counts.iter_mut() {
        c.category_count = c
            .category
            .as_ref()
            .and_then(|cat| totals.get(cat).copied())
            .unwrap_or(0);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discipline {
    pub discipline: String,
    pub category: String,
    /// Matched patterns across all taxonomies, `", "`-joined.
    pub keywords: String,
}

/// Competing keyword tables, e.g. computational vs experimental. The table
/// with the most keyword hits names the discipline.
#[derive(Debug, Clone)]
pub struct DisciplineClassifier {
    candidates: Vec<(String, Taxonomy)>,
}

impl DisciplineClassifier {
    pub fn new(candidates: Vec<(String, Taxonomy)>) -> Self {
        DisciplineClassifier { candidates }
    }

    pub fn classify(&self, text: &str) -> Discipline {
        let counted: Vec<(&str, Vec<KeywordCount>)> = self
            .candidates
            .iter()
            .map(|(label, taxonomy)| {
                let mut counts = count_occurrences(text, taxonomy);
                aggregate_categories(&mut counts);
                (label.as_str(), counts)
            })
            .collect();

        let keywords = counted
            .iter()
            .flat_map(|(_, counts)| counts)
            .filter(|c| c.keyword_count > 0)
            .map(|c| c.keyword.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut dominant: Option<(usize, &str, &[KeywordCount])> = None;
        for (label, counts) in &counted {
            let total: usize = counts.iter().map(|c| c.keyword_count).sum();
            if total > 0 && dominant.map_or(true, |(best, _, _)| total > best) {
                dominant = Some((total, *label, counts.as_slice()));
            }
        }

        match dominant {
            Some((_, label, counts)) => Discipline {
                discipline: label.to_string(),
                category: strongest_category(counts).unwrap_or(UNDETERMINED).to_string(),
                keywords,
            },
            None => Discipline {
                discipline: UNDETERMINED.to_string(),
                category: UNDETERMINED.to_string(),
                keywords,
            },
        }
    }
}

/// Category of the first entry carrying the largest category total.
fn strongest_category(counts: &[KeywordCount]) -> Option<&str> {
    let mut best: Option<&KeywordCount> = None;
    for c in counts {
        if c.category_count > 0 && best.map_or(true, |b| c.category_count > b.category_count) {
            best = Some(c);
        }
    }
    best.and_then(|c| c.category.as_deref())
}

#[cfg(test)]
mod tests {
    use super::super::taxonomy::TaxonomyEntry;
    use super::*;

    fn tax(rows: &[(&str, Option<&str>)]) -> Taxonomy {
        Taxonomy::from_entries(
            rows.iter()
                .map(|(p, c)| TaxonomyEntry::new(p, *c, 0.0).unwrap())
                .collect(),
        )
    }

    fn classifier() -> DisciplineClassifier {
        DisciplineClassifier::new(vec![
            (
                "computational".into(),
                tax(&[
                    ("simulat", Some("simulation")),
                    ("finite element", Some("simulation")),
                    ("neural network", Some("machine learning")),
                    ("model", None),
                ]),
            ),
            (
                "experimental".into(),
                tax(&[
                    ("laboratory", Some("lab")),
                    ("core sample", Some("field")),
                    ("x-ray", Some("imaging")),
                ]),
            ),
        ])
    }

    #[test]
    fn counts_per_entry() {
        let t = tax(&[("flow", Some("a")), ("pore", Some("a"))]);
        let counts = count_occurrences("Flow through pores; flow again.", &t);
        assert_eq!(counts[0].keyword_count, 2);
        assert_eq!(counts[1].keyword_count, 1);
        assert_eq!(counts[0].category_count, 0);
    }

    #[test]
    fn category_totals_broadcast_to_members() {
        let t = tax(&[("a", Some("x")), ("b", Some("x")), ("c", Some("y")), ("d", None)]);
        let mut counts = count_occurrences("a a b c d d", &t);
        aggregate_categories(&mut counts);
        let cats: Vec<usize> = counts.iter().map(|c| c.category_count).collect();
        assert_eq!(cats, vec![3, 3, 1, 0]);
    }

    #[test]
    fn dominant_discipline_by_total_hits() {
        let d = classifier().classify(
            "We simulate flow with a finite element model and validate it with one laboratory test.",
        );
        assert_eq!(d.discipline, "computational");
        assert_eq!(d.category, "simulation");
        assert_eq!(d.keywords, "simulat, finite element, model, laboratory");
    }

    #[test]
    fn experimental_wins_with_more_hits() {
        let d = classifier().classify("Laboratory X-ray scans of a core sample.");
        assert_eq!(d.discipline, "experimental");
        assert_eq!(d.category, "lab");
    }

    #[test]
    fn no_hits_is_undetermined() {
        let d = classifier().classify("A review of policy documents.");
        assert_eq!(d.discipline, UNDETERMINED);
        assert_eq!(d.category, UNDETERMINED);
        assert!(d.keywords.is_empty());
    }

    #[test]
    fn tie_goes_to_first_taxonomy() {
        let d = classifier().classify("One simulation and one laboratory.");
        assert_eq!(d.discipline, "computational");
    }

    #[test]
    fn only_uncategorized_hits_leave_category_undetermined() {
        let d = classifier().classify("A conceptual model.");
        assert_eq!(d.discipline, "computational");
        assert_eq!(d.category, UNDETERMINED);
    }
}
