//! Error type for the sync engine.

use entsync_core::CoreError;
use thiserror::Error;

/// Errors surfaced by adapter operations and config loading.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Namespace path was empty or had an empty segment.
    #[error("invalid namespace path {0:?}")]
    InvalidNamespace(String),
    /// Shared state could not hold the write.
    #[error(transparent)]
    State(#[from] CoreError),
    /// Config file could not be read.
    #[error("failed to read sync config: {0}")]
    Io(#[from] std::io::Error),
    /// Config file could not be parsed.
    #[error("failed to parse sync config: {0}")]
    Config(#[from] toml::de::Error),
    /// Config could not be written out.
    #[error("failed to serialize sync config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
