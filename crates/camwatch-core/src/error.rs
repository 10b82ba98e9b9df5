//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading either configuration layer.
///
/// A fleet document error is fatal to a single monitor cycle only; the
/// next cycle reloads the document from scratch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read of {path} timed out")]
    Timeout { path: PathBuf },

    #[error("failed to parse fleet document {path}: {source}")]
    Fleet {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse settings {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid time of day [{hour}, {minute}] for {field}")]
    InvalidTime {
        field: &'static str,
        hour: u32,
        minute: u32,
    },

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid utc offset: {0}")]
    InvalidOffset(String),
}
