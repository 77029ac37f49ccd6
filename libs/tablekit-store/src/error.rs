use thiserror::Error;

/// Errors surfaced by a table storage backend.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("row not found: {partition_key}/{row_key}")]
    NotFound {
        partition_key: String,
        row_key: String,
    },

    #[error("row already exists: {partition_key}/{row_key}")]
    AlreadyExists {
        partition_key: String,
        row_key: String,
    },

    #[error("concurrency token mismatch for {partition_key}/{row_key}")]
    EtagMismatch {
        partition_key: String,
        row_key: String,
    },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid continuation token")]
    InvalidContinuation,

    #[error("operation cancelled")]
    Cancelled,

    #[error("backend error: {0}")]
    Backend(String),
}
