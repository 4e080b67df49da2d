use std::path::PathBuf;

use quire_types::TypeError;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced entity or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A response references an entry that does not exist.
    #[error("parent entry does not exist: {0}")]
    InvalidParent(String),

    /// A pingback from this source has already been stored.
    #[error("pingback already registered: {0}")]
    AlreadyRegistered(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed identifier (category, filename, response id).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The blog configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A stored file could not be decoded.
    #[error("corrupt file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::Config(msg) => Self::Config(msg),
            other => Self::InvalidId(other.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
