//! Error types for assessrec

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for assessrec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in assessrec operations
#[derive(Error, Debug)]
pub enum Error {
    /// An index build was requested with zero items
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    /// The index was queried or saved before a successful build or load
    #[error("index has not been built; call build_index() or load_index() first")]
    NotBuilt,

    /// One of the persisted index artifacts does not exist
    #[error("index artifact not found: {}", path.display())]
    MissingArtifact { path: PathBuf },

    /// Persisted artifacts exist but are unreadable or inconsistent
    #[error("corrupt index artifact: {0}")]
    CorruptArtifact(String),

    /// The embedding backend failed or misbehaved
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be read or failed validation
    #[error("config error: {0}")]
    Config(String),

    /// Failed to encode or decode a persisted structure
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
