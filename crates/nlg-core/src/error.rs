//! Error types for the ingestion contract.

use thiserror::Error;

/// Errors that can occur while building or ingesting experiment records.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// A schema value failed validation on construction.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Raw vendor data could not be parsed.
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        /// File or record the data came from.
        source_name: String,
        /// What went wrong.
        message: String,
    },

    /// A file or folder the adapter depends on is missing.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Circuits of one run disagree on the total shot count.
    #[error("Inconsistent shot counts in run {run}: {shots:?}")]
    InconsistentShots {
        /// Identifier of the offending run.
        run: String,
        /// The distinct totals observed.
        shots: Vec<u64>,
    },

    /// A game name did not resolve to exactly one stored game.
    #[error("Expected exactly one game named '{name}', found {matches}")]
    GameLookup {
        /// Requested game name.
        name: String,
        /// Number of matching records.
        matches: usize,
    },

    /// The remote job service failed.
    #[error("Job service error: {0}")]
    JobService(String),

    /// The persistence layer failed.
    #[error("Store error: {0}")]
    Store(String),

    /// A worker task panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Task(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Build a parse error for the given source.
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::InconsistentShots {
            run: "exp-1".into(),
            shots: vec![1000, 1024],
        };
        assert_eq!(
            err.to_string(),
            "Inconsistent shot counts in run exp-1: [1000, 1024]"
        );

        let err = IngestError::GameLookup {
            name: "G14".into(),
            matches: 0,
        };
        assert_eq!(
            err.to_string(),
            "Expected exactly one game named 'G14', found 0"
        );

        let err = IngestError::parse("Blue data.txt", "unexpected token");
        assert!(err.to_string().contains("Blue data.txt"));
    }
}
