use quire_store::StoreError;
use quire_types::TypeError;

/// Errors a submission stage can raise.
///
/// These never reach the submitter: the pipeline logs them and reports the
/// submission as dropped.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid submission target: {0}")]
    Target(#[from] TypeError),

    /// A stage returned an unexpected error.
    #[error("stage error in '{stage}': {message}")]
    StageError { stage: String, message: String },
}

impl GateError {
    /// Create a stage error with a name and message.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the gate crate.
pub type GateResult<T> = Result<T, GateError>;
