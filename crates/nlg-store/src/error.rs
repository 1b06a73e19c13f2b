//! Error handling for the document store.

use nlg_core::IngestError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Document id not present in the table.
    #[error("Document {id} not found in table '{table}'")]
    DocumentNotFound { table: String, id: u64 },

    /// Records must be JSON objects.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The database file exists but does not have the table layout.
    #[error("Corrupt database file: {0}")]
    Corrupt(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        IngestError::Store(e.to_string())
    }
}
