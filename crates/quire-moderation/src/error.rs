use quire_store::StoreError;

/// Errors from moderation calls that are not per-item.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the moderation crate.
pub type ModerationResult<T> = Result<T, ModerationError>;
