use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid category path: {0}")]
    InvalidCategory(String),

    #[error("invalid entry filename: {0}")]
    InvalidFilename(String),

    #[error("invalid response id: {0}")]
    InvalidResponseId(String),

    #[error("unknown response status: {0}")]
    InvalidStatus(String),

    #[error("blog configuration error: {0}")]
    Config(String),
}
