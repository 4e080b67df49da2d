use chrono::{DateTime, Utc};

use quire_types::{keys, EntryRef, Metadata};

/// A comment on its way to the store, exposed to pre-persist listeners.
///
/// Listeners run synchronously after validation and sanitization and
/// before the write. They may rewrite any field, add metadata, approve the
/// comment outright, or veto it with [`SubmissionEvent::destroy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionEvent {
    pub blog: String,
    pub entry: EntryRef,
    pub ip: String,
    pub author: String,
    pub author_email: String,
    pub author_url: String,
    pub body: String,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

impl SubmissionEvent {
    /// Suppress persistence of this comment.
    pub fn destroy(&mut self) {
        self.metadata
            .insert(keys::COMMENT_DESTROY.to_string(), "true".to_string());
    }

    pub fn is_destroyed(&self) -> bool {
        self.metadata.contains_key(keys::COMMENT_DESTROY)
    }

    /// Store the comment as already approved.
    pub fn approve(&mut self) {
        self.metadata
            .insert(keys::COMMENT_APPROVED.to_string(), "true".to_string());
    }

    pub fn is_preapproved(&self) -> bool {
        self.metadata
            .get(keys::COMMENT_APPROVED)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

/// Synchronous hook run before a comment is persisted.
pub trait SubmissionListener: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, event: &mut SubmissionEvent);
}
