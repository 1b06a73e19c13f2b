//! Error types for the IBM Quantum adapter.

use std::path::PathBuf;

use nlg_core::IngestError;
use thiserror::Error;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Errors that can occur when reading IBM batches or querying IBM Quantum.
#[derive(Debug, Error)]
pub enum IbmError {
    /// Missing API token.
    #[error("IBM Quantum API token not found. Set IBM_QUANTUM_TOKEN environment variable.")]
    MissingToken,

    /// Invalid API token.
    #[error("Invalid IBM Quantum API token")]
    InvalidToken,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error.
    #[error("IBM Quantum API error: {message}")]
    ApiError {
        /// Error code from API.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A file could not be read or written.
    #[error("Cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error.
    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The result archive is corrupt.
    #[error("{}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Data that parsed but makes no sense.
    #[error("{}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    /// A SPAM matrix cannot be inverted.
    #[error("SPAM matrix in the {0} basis is singular")]
    SingularMatrix(String),

    /// Matrix and vector dimensions disagree.
    #[error("Dimension mismatch: {0}")]
    Dimension(String),
}

impl IbmError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        IbmError::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<IbmError> for IngestError {
    fn from(e: IbmError) -> Self {
        match e {
            IbmError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                IngestError::MissingData(path.display().to_string())
            }
            IbmError::Io { source, .. } => IngestError::Io(source),
            IbmError::Json { ref path, .. }
            | IbmError::Archive { ref path, .. }
            | IbmError::Invalid { ref path, .. } => {
                IngestError::parse(path.display().to_string(), e.to_string())
            }
            IbmError::SingularMatrix(_) | IbmError::Dimension(_) => {
                IngestError::Validation(e.to_string())
            }
            IbmError::MissingToken
            | IbmError::InvalidToken
            | IbmError::HttpError(_)
            | IbmError::ApiError { .. }
            | IbmError::JobNotFound(_) => IngestError::JobService(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_ingest_error() {
        let missing = IbmError::Io {
            path: PathBuf::from("exp/metadata.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(matches!(IngestError::from(missing), IngestError::MissingData(_)));

        let api = IbmError::JobNotFound("job-1".into());
        assert!(matches!(IngestError::from(api), IngestError::JobService(_)));

        let invalid = IbmError::invalid("exp/raw/job/game", "no circuits");
        let err = IngestError::from(invalid);
        assert!(err.to_string().contains("no circuits"));
    }
}
