use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quire_types::{
    truncate_to_millis, Comment, Entry, EntryRef, Pingback, ResponseId, ResponseKind,
    ResponseStatus, Trackback,
};

/// Identifier of a blog event: BLAKE3 over its core fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub hash: [u8; 32],
}

impl EventId {
    /// Short hex representation (first 8 hex chars).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.hash[..4])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt:{}", self.short_hex())
    }
}

/// What kind of thing an event is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Entry,
    Comment,
    Trackback,
    Pingback,
}

impl From<ResponseKind> for Subject {
    fn from(kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Comment => Self::Comment,
            ResponseKind::Trackback => Self::Trackback,
            ResponseKind::Pingback => Self::Pingback,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Entry => "Entry",
            Self::Comment => "Comment",
            Self::Trackback => "Trackback",
            Self::Pingback => "Pingback",
        };
        write!(f, "{s}")
    }
}

/// What happened to the subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Added,
    Updated,
    Deleted,
    /// Moderation set the status to `approved`.
    Approved,
    /// Moderation set the status to `spam`.
    MarkedSpam,
    /// Moderation set the status back to `new`.
    Unmoderated,
}

impl EventKind {
    /// The moderation event matching a status transition.
    pub fn for_status(status: ResponseStatus) -> Self {
        match status {
            ResponseStatus::Approved => Self::Approved,
            ResponseStatus::Spam => Self::MarkedSpam,
            ResponseStatus::New => Self::Unmoderated,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "Added",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
            Self::Approved => "Approved",
            Self::MarkedSpam => "MarkedSpam",
            Self::Unmoderated => "Unmoderated",
        };
        write!(f, "{s}")
    }
}

/// The persisted response an event carries, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    Empty,
    Comment(Box<Comment>),
    Trackback(Box<Trackback>),
    Pingback(Box<Pingback>),
}

/// Notification broadcast after a successful mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    /// Identity of the owning blog (its home directory).
    pub blog: String,
    pub subject: Subject,
    pub kind: EventKind,
    /// Textual id of the affected entity.
    pub target: String,
    /// The entry the subject belongs to (or is).
    pub entry_ref: Option<EntryRef>,
    /// Full entry, when the emitter had it loaded.
    pub entry: Option<Box<Entry>>,
    pub payload: EventPayload,
}

impl BlogEvent {
    pub fn new(
        blog: impl Into<String>,
        subject: Subject,
        kind: EventKind,
        target: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let blog = blog.into();
        let target = target.into();
        let timestamp = truncate_to_millis(timestamp);
        let id = Self::compute_id(&blog, subject, kind, &target, timestamp);
        Self {
            id,
            timestamp,
            blog,
            subject,
            kind,
            target,
            entry_ref: None,
            entry: None,
            payload: EventPayload::Empty,
        }
    }

    /// `CommentAdded` carrying the stored comment and its entry.
    pub fn comment_added(
        blog: impl Into<String>,
        id: &ResponseId,
        comment: Comment,
        entry: Entry,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(blog, Subject::Comment, EventKind::Added, id.to_string(), timestamp)
            .with_entry_ref(id.entry.clone())
            .with_entry(entry)
            .with_payload(EventPayload::Comment(Box::new(comment)))
    }

    /// Event about a response identified only by id.
    pub fn response(
        blog: impl Into<String>,
        kind: EventKind,
        id: &ResponseId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(blog, id.kind.into(), kind, id.to_string(), timestamp)
            .with_entry_ref(id.entry.clone())
    }

    pub fn entry_event(
        blog: impl Into<String>,
        kind: EventKind,
        entry: &EntryRef,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(blog, Subject::Entry, kind, entry.to_string(), timestamp)
            .with_entry_ref(entry.clone())
    }

    pub fn with_entry_ref(mut self, entry: EntryRef) -> Self {
        self.entry_ref = Some(entry);
        self
    }

    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.entry = Some(Box::new(entry));
        self
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Conventional event name, e.g. `CommentAdded` or `TrackbackMarkedSpam`.
    pub fn name(&self) -> String {
        format!("{}{}", self.subject, self.kind)
    }

    fn compute_id(
        blog: &str,
        subject: Subject,
        kind: EventKind,
        target: &str,
        timestamp: DateTime<Utc>,
    ) -> EventId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"quire-event-v1:");
        hasher.update(blog.as_bytes());
        hasher.update(b":");
        hasher.update(subject.to_string().as_bytes());
        hasher.update(kind.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(target.as_bytes());
        hasher.update(&timestamp.timestamp_millis().to_le_bytes());
        EventId {
            hash: *hasher.finalize().as_bytes(),
        }
    }
}
