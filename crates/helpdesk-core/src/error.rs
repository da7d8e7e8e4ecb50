use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("Index not found at {}: run the ingest step first", path.display())]
    IndexNotFound { path: PathBuf },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Never returned from `search`; logged when the searcher falls back to brute force.
    #[error("Accelerated structure unavailable: {0}")]
    AcceleratedStructureUnavailable(String),

    /// Never returned from metric aggregation; logged when a log line is skipped.
    #[error("Malformed feedback record on line {line}: {reason}")]
    MalformedFeedbackRecord { line: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding dimension mismatch: index has {expected}, embedder produces {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("No feedback recorded yet at {}", path.display())]
    NoFeedback { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
