//! Blog events for quire.
//!
//! Two hooks surround every comment write. Pre-persist
//! [`SubmissionListener`]s run synchronously and may rewrite or veto the
//! comment. After the store write succeeds, a [`BlogEvent`] is broadcast to
//! async subscribers (notification, spam reporting, search indexing).

pub mod broadcaster;
pub mod error;
pub mod event;
pub mod listener;

pub use broadcaster::{EventBroadcaster, EventFilter, EventStream, DEFAULT_CHANNEL_CAPACITY};
pub use error::{EventError, EventResult};
pub use event::{BlogEvent, EventId, EventKind, EventPayload, Subject};
pub use listener::{SubmissionEvent, SubmissionListener};
