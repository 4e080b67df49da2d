use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::CategoryPath;
use crate::error::TypeError;
use crate::metadata::{keys, truncate_to_millis, Metadata};
use crate::response::{Comment, Pingback, Trackback};

/// Stable identity of an entry: its category plus its source filename.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryRef {
    pub category: CategoryPath,
    pub filename: String,
}

impl EntryRef {
    /// Build a reference, rejecting filenames that are empty, hidden, or
    /// contain a path separator.
    pub fn new(category: CategoryPath, filename: impl Into<String>) -> Result<Self, TypeError> {
        let filename = filename.into();
        validate_filename(&filename)?;
        Ok(Self { category, filename })
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.category, self.filename)
    }
}

pub(crate) fn validate_filename(filename: &str) -> Result<(), TypeError> {
    let bad = filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\'])
        || filename.chars().any(char::is_control);
    if bad {
        return Err(TypeError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// One blog post.
///
/// `filename` is `None` until the first save assigns one; after that it
/// never changes. Responses are filled in by the store on load and are
/// never written back through the entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub category: CategoryPath,
    pub filename: Option<String>,
    pub title: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub metadata: Metadata,
    /// Whether the content file was writable when loaded.
    pub writable: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub trackbacks: Vec<Trackback>,
    #[serde(default)]
    pub pingbacks: Vec<Pingback>,
}

impl Entry {
    /// A new, unsaved entry dated now.
    pub fn new(category: CategoryPath, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = truncate_to_millis(Utc::now());
        Self {
            category,
            filename: None,
            title: title.into(),
            body: body.into(),
            created: now,
            modified: now,
            metadata: Metadata::new(),
            writable: true,
            comments: Vec::new(),
            trackbacks: Vec::new(),
            pingbacks: Vec::new(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.filename.is_none()
    }

    /// Identity of a saved entry.
    pub fn entry_ref(&self) -> Option<EntryRef> {
        self.filename.as_ref().map(|filename| EntryRef {
            category: self.category.clone(),
            filename: filename.clone(),
        })
    }

    pub fn permalink(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Public id in the form `/<category>?permalink=<filename>`.
    pub fn id(&self) -> Option<String> {
        self.filename
            .as_ref()
            .map(|f| format!("{}?permalink={}", self.category, f))
    }

    /// Comments are accepted only on entries whose file is writable.
    pub fn supports_comments(&self) -> bool {
        self.writable
    }

    pub fn comments_disabled(&self) -> bool {
        self.metadata.contains_key(keys::COMMENTS_DISABLED)
    }

    /// Whole days elapsed since creation.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created).num_days()
    }
}
