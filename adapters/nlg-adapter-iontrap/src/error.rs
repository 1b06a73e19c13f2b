//! Error types for the trapped-ion adapter.

use std::path::PathBuf;

use nlg_core::IngestError;
use thiserror::Error;

use crate::literal::LiteralError;

/// Result type for trapped-ion operations.
pub type IonTrapResult<T> = Result<T, IonTrapError>;

/// Errors that can occur while reading trapped-ion data.
#[derive(Debug, Error)]
pub enum IonTrapError {
    /// The dict-literal file is malformed.
    #[error("{file}: {source}")]
    Literal {
        file: String,
        #[source]
        source: LiteralError,
    },

    /// CSV parsing error.
    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// JSON parsing error.
    #[error("{file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// A source file could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A circuit index has no question in the circuit mapping.
    #[error("{file}: circuit {index} is missing from the circuit mapping")]
    UnknownCircuit { file: String, index: u32 },

    /// Data that parsed but makes no sense.
    #[error("{file}: {message}")]
    Invalid { file: String, message: String },
}

impl From<IonTrapError> for IngestError {
    fn from(e: IonTrapError) -> Self {
        match e {
            IonTrapError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                IngestError::MissingData(path.display().to_string())
            }
            IonTrapError::Io { source, .. } => IngestError::Io(source),
            IonTrapError::Literal { ref file, .. }
            | IonTrapError::Csv { ref file, .. }
            | IonTrapError::Json { ref file, .. }
            | IonTrapError::UnknownCircuit { ref file, .. }
            | IonTrapError::Invalid { ref file, .. } => IngestError::parse(file.clone(), e.to_string()),
        }
    }
}
