pub mod document;
pub mod locate;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::scoring::discipline::{Discipline, DisciplineClassifier};
use crate::scoring::taxonomy::Taxonomies;
use crate::scoring::{ScoreResult, Scorer};
use document::Document;
use locate::{ExtractionResult, Locator};

pub const PLACEHOLDER: &str = "N/A";
pub const CLOSED_ACCESS: &str = "closed access";

const ABSTRACT_KEYS: &[&str] = &["Abstract"];
const RIGHTS_KEYS: &[&str] = &["rights", "permission"];
const AVAILABILITY_KEY_SETS: &[&[&str]] = &[&["data", "avail"], &["code", "avail"]];

/// Everything derived for one record. Placeholder analyses carry `N/A`
/// text and zero scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub fetch_status: String,
    pub rights: ScoreResult,
    pub rights_section: String,
    pub abstract_text: String,
    pub discipline: Discipline,
    pub availability: ScoreResult,
    pub availability_section: String,
}

impl Analysis {
    pub fn placeholder(fetch_status: &str) -> Self {
        let na = || PLACEHOLDER.to_string();
        Analysis {
            fetch_status: fetch_status.to_string(),
            rights: ScoreResult { score: 0.0, category: na() },
            rights_section: na(),
            abstract_text: na(),
            discipline: Discipline {
                discipline: na(),
                category: na(),
                keywords: na(),
            },
            availability: ScoreResult { score: 0.0, category: na() },
            availability_section: na(),
        }
    }

    /// Derived output cells, in output column order.
    pub fn cells(&self, article_type: &str) -> Vec<String> {
        vec![
            article_type.to_string(),
            self.fetch_status.clone(),
            self.rights.score.to_string(),
            self.rights.category.clone(),
            self.rights_section.clone(),
            self.abstract_text.clone(),
            self.discipline.discipline.clone(),
            self.discipline.category.clone(),
            self.discipline.keywords.clone(),
            self.availability.score.to_string(),
            self.availability.category.clone(),
            self.availability_section.clone(),
        ]
    }
}

/// Locator, scorers and classifier for a run; shared read-only across
/// worker threads.
pub struct Analyzer {
    locator: Locator,
    open_access: Scorer,
    availability: Scorer,
    disciplines: DisciplineClassifier,
    debug_dir: PathBuf,
}

impl Analyzer {
    pub fn new(taxonomies: Taxonomies, debug_dir: &Path) -> Self {
        let Taxonomies {
            open_access,
            availability,
            numerical,
            experimental,
        } = taxonomies;
        Analyzer {
            locator: Locator::default(),
            open_access: Scorer::new(open_access, CLOSED_ACCESS),
            availability: Scorer::new(availability, CLOSED_ACCESS),
            disciplines: DisciplineClassifier::new(vec![
                ("computational".to_string(), numerical),
                ("experimental".to_string(), experimental),
            ]),
            debug_dir: debug_dir.to_path_buf(),
        }
    }

    /// Parse, locate and score one fetched page. A page without an abstract
    /// degrades to a placeholder; a page without a rights section is fatal.
    pub fn analyze(&self, index: usize, url: &str, html: &str) -> Result<Analysis, PipelineError> {
        let doc = Document::parse(html);

        let abstract_text = match self.abstract_of(&doc).into_option() {
            Some(text) => text,
            None => {
                let artifact = save_artifact(&self.debug_dir, index, url, &doc)?;
                warn!(
                    "[{}] No abstract on {}, page saved to {}",
                    index,
                    url,
                    artifact.display()
                );
                return Ok(Analysis::placeholder("no-abstract"));
            }
        };

        let rights = self.locator.locate_titled(&doc, RIGHTS_KEYS);
        let Some(rights_section) = rights.text() else {
            let artifact = save_artifact(&self.debug_dir, index, url, &doc)?;
            return Err(PipelineError::MandatorySectionMissing {
                index,
                url: url.to_string(),
                concept: RIGHTS_KEYS.join(", "),
                artifact,
            });
        };
        let rights_score = self.open_access.score(&rights);

        let discipline = self.disciplines.classify(&abstract_text);

        let data = self.data_availability(&doc);
        let availability = self.availability.score(&data);

        info!(
            "[{}] {}: access {} ({}), {} / {}, data {} ({})",
            index,
            url,
            rights_score.score,
            rights_score.category,
            discipline.discipline,
            discipline.category,
            availability.score,
            availability.category
        );
        debug!(index, keywords = %discipline.keywords, "abstract keywords");

        Ok(Analysis {
            fetch_status: "ok".to_string(),
            rights_section: rights_section.to_string(),
            rights: rights_score,
            abstract_text,
            discipline,
            availability,
            availability_section: data.into_option().unwrap_or_default(),
        })
    }

    pub fn abstract_of(&self, doc: &Document) -> ExtractionResult {
        match self.locator.locate_titled(doc, ABSTRACT_KEYS) {
            ExtractionResult::NotFound => {
                self.locator.locate_with_meta(doc, &[], ABSTRACT_KEYS)
            }
            found => found,
        }
    }

    /// Data and code availability are both wanted: each key set is tried
    /// title-ranked first, then through the cascade, and the distinct
    /// results are joined with a blank line.
    pub fn data_availability(&self, doc: &Document) -> ExtractionResult {
        let mut parts: Vec<String> = Vec::new();
        for keys in AVAILABILITY_KEY_SETS {
            let found = match self.locator.locate_titled(doc, keys) {
                ExtractionResult::NotFound => self.locator.locate(doc, keys),
                found => found,
            };
            if let ExtractionResult::Found(text) = found {
                if !parts.contains(&text) {
                    parts.push(text);
                }
            }
        }
        ExtractionResult::from_text(&parts.join("\n\n"))
    }
}

/// Write the parsed page to `<dir>/page_<index>.html` for inspection.
pub fn save_artifact(
    dir: &Path,
    index: usize,
    url: &str,
    doc: &Document,
) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("page_{}.html", index));
    let contents = format!(
        "<!-- url: {} captured: {} -->\n{}",
        url.replace("--", "%2D%2D"),
        Utc::now().to_rfc3339(),
        doc.html()
    );
    fs::write(&path, contents)?;
    Ok(path)
}

// ── Tests ──
