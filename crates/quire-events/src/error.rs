/// Errors surfaced to event subscribers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventError {
    /// The broadcaster was dropped; no more events will arrive.
    #[error("event channel closed")]
    Closed,

    /// The subscriber fell behind and missed this many events.
    #[error("subscriber lagged behind by {0} events")]
    Lagged(u64),
}

/// Convenience alias used throughout the events crate.
pub type EventResult<T> = Result<T, EventError>;
