use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a run, as opposed to per-record misses that only
/// degrade that record's derived columns.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input table has no '{0}' column")]
    MissingColumn(String),
    #[error("row {row}: unsupported content type '{value}'")]
    UnsupportedContentType { row: usize, value: String },
    #[error("taxonomy {}: row {row}: {reason}", path.display())]
    Taxonomy {
        path: PathBuf,
        row: usize,
        reason: String,
    },
    #[error(
        "record {index} ({url}): mandatory section '{concept}' not found, page saved to {}",
        artifact.display()
    )]
    MandatorySectionMissing {
        index: usize,
        url: String,
        concept: String,
        artifact: PathBuf,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
