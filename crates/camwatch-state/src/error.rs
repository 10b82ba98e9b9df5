//! Error types for feed reads and restart-record persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("read error for {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read of {path} timed out")]
    Timeout { path: PathBuf },

    #[error("deserialization error for {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid timestamp {value:?} in {path}")]
    InvalidTimestamp { path: PathBuf, value: String },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("write error for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
