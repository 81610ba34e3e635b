//! Error kinds for an analysis run.
//!
//! Only structural failures are fatal. Malformed individual cells never
//! surface here; they degrade to zero during ingest.

use std::path::PathBuf;

/// Fatal failures that abort the run with no artifact written.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The source table cannot be loaded at all.
    #[error("failed to read source table {path}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A key column is missing from the input header.
    #[error("required column {0:?} not found in the input header")]
    MissingColumn(String),

    /// Cleaning left nothing to analyze.
    #[error("no analyzable rows after cleaning: {0}")]
    Data(String),
}
