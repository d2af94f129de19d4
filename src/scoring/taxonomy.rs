use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::PipelineError;

pub const OPEN_ACCESS_FILE: &str = "open_access_scores.csv";
pub const AVAILABILITY_FILE: &str = "availability_scores.csv";
pub const NUMERICAL_FILE: &str = "numerical_keywords.csv";
pub const EXPERIMENTAL_FILE: &str = "experimental_keywords.csv";

/// One `(pattern, category, weight)` row. The pattern is a regex fragment,
/// always matched case-insensitively; it is never treated as a literal.
#[derive(Debug, Clone)]
pub struct TaxonomyEntry {
    pub pattern: String,
    pub category: Option<String>,
    pub weight: f64,
    regex: Regex,
}

impl TaxonomyEntry {
    pub fn new(
        pattern: &str,
        category: Option<&str>,
        weight: f64,
    ) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(TaxonomyEntry {
            pattern: pattern.to_string(),
            category: category.map(str::to_string),
            weight,
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Non-overlapping matches in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

#[derive(Debug, Deserialize)]
struct TaxonomyRow {
    keyword: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

/// An ordered keyword table. Order matters: ties resolve to the earlier row.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    entries: Vec<TaxonomyEntry>,
}

impl Taxonomy {
    pub fn from_entries(entries: Vec<TaxonomyEntry>) -> Self {
        Taxonomy { entries }
    }

    /// Load a `keyword,category,score` CSV. `category` and `score` columns
    /// are optional; blank keywords are skipped.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)?;
        let taxonomy = Self::from_reader(file, path)?;
        if taxonomy.is_empty() {
            warn!("{} has no keywords; every text scores as no evidence", path.display());
        } else {
            info!("Loaded {} keywords from {}", taxonomy.len(), path.display());
        }
        Ok(taxonomy)
    }

    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self, PipelineError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut entries = Vec::new();

        for (i, row) in rdr.deserialize::<TaxonomyRow>().enumerate() {
            let row_no = i + 1;
            let row = row.map_err(|e| taxonomy_error(origin, row_no, e.to_string()))?;
            if row.keyword.is_empty() {
                continue;
            }
            let category = row.category.as_deref().filter(|c| !c.is_empty());
            let entry = TaxonomyEntry::new(&row.keyword, category, row.score.unwrap_or(0.0))
                .map_err(|e| taxonomy_error(origin, row_no, e.to_string()))?;
            entries.push(entry);
        }

        Ok(Taxonomy { entries })
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn taxonomy_error(path: &Path, row: usize, reason: String) -> PipelineError {
    PipelineError::Taxonomy {
        path: path.to_path_buf(),
        row,
        reason,
    }
}

/// The four tables a run needs, loaded once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Taxonomies {
    pub open_access: Taxonomy,
    pub availability: Taxonomy,
    pub numerical: Taxonomy,
    pub experimental: Taxonomy,
}

impl Taxonomies {
    pub fn load_dir(dir: &Path) -> Result<Self, PipelineError> {
        let path = |name: &str| -> PathBuf { dir.join(name) };
        Ok(Taxonomies {
            open_access: Taxonomy::load(&path(OPEN_ACCESS_FILE))?,
            availability: Taxonomy::load(&path(AVAILABILITY_FILE))?,
            numerical: Taxonomy::load(&path(NUMERICAL_FILE))?,
            experimental: Taxonomy::load(&path(EXPERIMENTAL_FILE))?,
        })
    }
}
