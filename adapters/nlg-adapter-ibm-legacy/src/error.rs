//! Error types for the legacy IBM adapter.

use nlg_core::IngestError;
use thiserror::Error;

/// Result type for legacy IBM operations.
pub type LegacyResult<T> = Result<T, LegacyError>;

/// Errors that can occur while reading the 2023 IBM exports.
#[derive(Debug, Error)]
pub enum LegacyError {
    /// CSV parsing error.
    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// The `time` column of a job is not an ISO-8601 timestamp.
    #[error("Job {job}: invalid time '{value}'")]
    InvalidTime { job: String, value: String },

    /// A job has no rows.
    #[error("Job {0} has no circuits")]
    EmptyJob(String),
}

impl From<LegacyError> for IngestError {
    fn from(e: LegacyError) -> Self {
        match e {
            LegacyError::Csv { ref file, ref source } if source.is_io_error() => {
                IngestError::MissingData(format!("{file}: {source}"))
            }
            LegacyError::Csv { ref file, .. } => IngestError::parse(file.clone(), e.to_string()),
            LegacyError::InvalidTime { .. } | LegacyError::EmptyJob(_) => {
                IngestError::parse("ibm_processed.csv", e.to_string())
            }
        }
    }
}
