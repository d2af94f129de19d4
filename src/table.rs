use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::error::PipelineError;

/// Canonical field → vendor export header.
const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("url", "URL"),
    ("year", "Publication Year"),
    ("title", "Item Title"),
    ("doi", "Item DOI"),
    ("type", "Content Type"),
    ("journal", "Publication Title"),
];

const TYPE_LABELS: &[(&str, &str)] = &[
    ("Article", "article"),
    ("Review", "article"),
    ("Book Chapter", "book-chapter"),
    ("Book", "book"),
    ("Conference Paper", "conference-paper"),
    ("Data Paper", "data-paper"),
    ("Editorial", "editorial"),
    ("Letter", "letter"),
    ("News", "news"),
    ("Correction", "correction"),
    ("Retraction", "retraction"),
];

/// Columns appended to every output row, in order.
pub const DERIVED_COLUMNS: &[&str] = &[
    "article_type",
    "fetch_status",
    "article_availability_score",
    "article_availability_category",
    "article_availability_section",
    "abstract",
    "discipline",
    "category",
    "keywords",
    "data_availability_score",
    "data_availability_category",
    "data_availability_section",
];

/// The input table as read: header plus every cell as a string.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

/// One article, identified by its row position.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub index: usize,
    pub url: String,
    pub year: String,
    pub title: String,
    pub doi: String,
    pub article_type: String,
    pub journal: String,
}

impl Table {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)?;
        let table = Self::from_reader(file)?;
        info!("Read {} rows from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PipelineError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let rows = rdr.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Table { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }

    /// Header position for a canonical field, accepting the vendor name too.
    fn column(&self, field: &str) -> Option<usize> {
        let vendor = COLUMN_ALIASES
            .iter()
            .find(|(canonical, _)| *canonical == field)
            .map(|(_, v)| *v);
        self.headers
            .iter()
            .position(|h| h.trim() == field)
            .or_else(|| vendor.and_then(|v| self.headers.iter().position(|h| h.trim() == v)))
    }

    /// Resolve every row into a `Record`. Fails on a missing URL or type
    /// column and on the first content type `types` cannot map.
    pub fn records(&self, types: &TypeMap) -> Result<Vec<Record>, PipelineError> {
        let url = self
            .column("url")
            .ok_or_else(|| PipelineError::MissingColumn("url".into()))?;
        let kind = self
            .column("type")
            .ok_or_else(|| PipelineError::MissingColumn("type".into()))?;
        let year = self.column("year");
        let title = self.column("title");
        let doi = self.column("doi");
        let journal = self.column("journal");

        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let cell = |col: Option<usize>| -> String {
                    col.and_then(|c| row.get(c)).unwrap_or("").trim().to_string()
                };
                let raw_type = cell(Some(kind));
                let article_type = types.normalize(&raw_type).ok_or_else(|| {
                    PipelineError::UnsupportedContentType {
                        row: index,
                        value: raw_type.clone(),
                    }
                })?;
                Ok(Record {
                    index,
                    url: cell(Some(url)),
                    year: cell(year),
                    title: cell(title),
                    doi: cell(doi),
                    article_type: article_type.to_string(),
                    journal: cell(journal),
                })
            })
            .collect()
    }

    /// Write every input column unchanged, then `DERIVED_COLUMNS`. `derived`
    /// must hold one row per input row.
    pub fn write(&self, path: &Path, derived: &[Vec<String>]) -> Result<(), PipelineError> {
        let file = File::create(path)?;
        self.write_to(file, derived)?;
        info!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    pub fn write_to<W: Write>(
        &self,
        writer: W,
        derived: &[Vec<String>],
    ) -> Result<(), PipelineError> {
        if derived.len() != self.rows.len() {
            return Err(PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "{} derived rows for {} input rows",
                    derived.len(),
                    self.rows.len()
                ),
            )));
        }

        let width = self.headers.len();
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header: Vec<&str> = self.headers.iter().collect();
        header.extend_from_slice(DERIVED_COLUMNS);
        wtr.write_record(&header)?;

        for (index, (row, extra)) in self.rows.iter().zip(derived).enumerate() {
            if row.len() > width {
                warn!(
                    "Row {}: {} cells beyond the {} header columns are not written",
                    index,
                    row.len() - width,
                    width
                );
            }
            // Pad short rows so derived values stay under their own headers
            let mut cells: Vec<&str> = row.iter().take(width).collect();
            cells.resize(width, "");
            cells.extend(extra.iter().map(String::as_str));
            wtr.write_record(&cells)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

/// Vendor content-type label → normalized article type. Case-insensitive;
/// normalized labels map to themselves.
#[derive(Debug, Clone)]
pub struct TypeMap {
    labels: HashMap<String, String>,
}

impl TypeMap {
    pub fn new(extra: &HashMap<String, String>) -> Self {
        let mut labels = HashMap::new();
        for (vendor, normalized) in TYPE_LABELS {
            labels.insert(vendor.to_lowercase(), normalized.to_string());
            labels.insert(normalized.to_string(), normalized.to_string());
        }
        for (vendor, normalized) in extra {
            let normalized = normalized.trim().to_lowercase();
            labels.insert(vendor.trim().to_lowercase(), normalized.clone());
            labels.insert(normalized.clone(), normalized);
        }
        TypeMap { labels }
    }

    pub fn normalize(&self, value: &str) -> Option<&str> {
        let key = value.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.labels.get(&key).map(String::as_str)
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VENDOR: &str = "\
Item Title,Publication Title,Book Series Title,Item DOI,Publication Year,URL,Content Type
Flow in pores,Transport in Porous Media,,10.1007/x1,2024,https://link.springer.com/article/10.1007/x1,Article
\"Imbibition, revisited\",Transport in Porous Media,,10.1007/x2,2023,,Review
";

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn vendor_columns_resolve() {
        let recs = table(VENDOR).records(&TypeMap::default()).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].url, "https://link.springer.com/article/10.1007/x1");
        assert_eq!(recs[0].year, "2024");
        assert_eq!(recs[0].doi, "10.1007/x1");
        assert_eq!(recs[0].journal, "Transport in Porous Media");
        assert_eq!(recs[1].title, "Imbibition, revisited");
        assert_eq!(recs[1].article_type, "article");
        assert_eq!(recs[1].url, "");
        assert_eq!(recs[1].index, 1);
    }

    #[test]
    fn canonical_columns_resolve() {
        let recs = table("url,type,title\nhttps://a.org/1,book chapter,T\n")
            .records(&TypeMap::default())
            .unwrap();
        assert_eq!(recs[0].article_type, "book-chapter");
        assert_eq!(recs[0].title, "T");
        assert_eq!(recs[0].year, "");
    }

    #[test]
    fn missing_url_column_is_fatal() {
        let err = table("title,type\nT,Article\n")
            .records(&TypeMap::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(c) if c == "url"));
    }

    #[test]
    fn unmapped_type_names_the_row() {
        let err = table("url,type\nhttps://a,Article\nhttps://b,Podcast\n")
            .records(&TypeMap::default())
            .unwrap_err();
        match err {
            PipelineError::UnsupportedContentType { row, value } => {
                assert_eq!(row, 1);
                assert_eq!(value, "Podcast");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_type_is_unsupported() {
        let err = table("url,type\nhttps://a,\n")
            .records(&TypeMap::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedContentType { row: 0, .. }));
    }

    #[test]
    fn extra_type_labels() {
        let mut extra = HashMap::new();
        extra.insert("short_communication".to_string(), "Letter".to_string());
        let types = TypeMap::new(&extra);
        assert_eq!(types.normalize("Short_Communication"), Some("letter"));
        assert_eq!(types.normalize("ARTICLE"), Some("article"));
        assert_eq!(types.normalize("data-paper"), Some("data-paper"));
        assert_eq!(types.normalize("Podcast"), None);
    }

    #[test]
    fn output_keeps_input_columns_and_row_count() {
        let t = table(VENDOR);
        let derived: Vec<Vec<String>> = (0..t.len())
            .map(|i| {
                DERIVED_COLUMNS
                    .iter()
                    .map(|c| format!("{}-{}", c, i))
                    .collect()
            })
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        t.write(&out, &derived).unwrap();

        let back = Table::load(&out).unwrap();
        assert_eq!(back.len(), t.len());

        let input_cols: Vec<&str> = t.headers.iter().collect();
        let headers: Vec<&str> = back.headers.iter().collect();
        assert_eq!(&headers[..input_cols.len()], input_cols.as_slice());
        assert_eq!(&headers[input_cols.len()..], DERIVED_COLUMNS);

        for (before, after) in t.rows.iter().zip(&back.rows) {
            let kept: Vec<&str> = after.iter().take(input_cols.len()).collect();
            assert_eq!(kept, before.iter().collect::<Vec<_>>());
        }
        assert_eq!(back.rows[1].get(input_cols.len() + 1), Some("fetch_status-1"));
    }

    #[test]
    fn ragged_rows_keep_derived_columns_aligned() {
        let t = table("url,type\nhttps://a,Article,stray,cells\nhttps://b\n");
        let derived: Vec<Vec<String>> = (0..t.len())
            .map(|i| DERIVED_COLUMNS.iter().map(|c| format!("{}-{}", c, i)).collect())
            .collect();
        let mut sink = Vec::new();
        t.write_to(&mut sink, &derived).unwrap();

        let back = Table::from_reader(sink.as_slice()).unwrap();
        let width = 2 + DERIVED_COLUMNS.len();
        assert!(back.rows.iter().all(|r| r.len() == width));
        assert_eq!(back.rows[0].get(0), Some("https://a"));
        assert_eq!(back.rows[0].get(2), Some("article_type-0"));
        assert_eq!(back.rows[1].get(1), Some(""));
        assert_eq!(back.rows[1].get(3), Some("fetch_status-1"));
    }

    #[test]
    fn derived_row_count_must_match() {
        let t = table(VENDOR);
        let mut sink = Vec::new();
        assert!(t.write_to(&mut sink, &[]).is_err());
    }
}
