//! Error types for the Rigetti adapter.

use std::path::PathBuf;

use nlg_core::IngestError;
use thiserror::Error;

/// Result type for Rigetti operations.
pub type RigettiResult<T> = Result<T, RigettiError>;

/// Errors that can occur while reading the Rigetti exports.
#[derive(Debug, Error)]
pub enum RigettiError {
    /// CSV parsing error.
    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// A backend folder could not be listed.
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required column is absent.
    #[error("{file}: missing column '{column}'")]
    MissingColumn { file: String, column: String },

    /// A cell does not hold the expected kind of value.
    #[error("{file}, row {row}: invalid {column} '{value}'")]
    InvalidValue {
        file: String,
        row: usize,
        column: String,
        value: String,
    },

    /// A circuit of the counts file has no row in the win-rate file.
    #[error("{file}: no win rate for row {row}")]
    MissingWinRate { file: String, row: usize },
}

impl From<RigettiError> for IngestError {
    fn from(e: RigettiError) -> Self {
        match e {
            RigettiError::Csv { ref file, ref source } if source.is_io_error() => {
                IngestError::MissingData(format!("{file}: {source}"))
            }
            RigettiError::Io { source, .. } => IngestError::Io(source),
            RigettiError::Csv { ref file, .. }
            | RigettiError::MissingColumn { ref file, .. }
            | RigettiError::InvalidValue { ref file, .. }
            | RigettiError::MissingWinRate { ref file, .. } => {
                IngestError::parse(file.clone(), e.to_string())
            }
        }
    }
}
