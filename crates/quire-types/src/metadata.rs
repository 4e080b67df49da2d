use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

/// String-keyed property map persisted in a sidecar file.
///
/// A `BTreeMap` keeps sidecar output ordered, so rewriting unchanged
/// metadata produces byte-identical files.
pub type Metadata = BTreeMap<String, String>;

/// Well-known metadata keys.
pub mod keys {
    /// Creation time of an entry in epoch milliseconds. Survives tools that
    /// touch the content file's modification time.
    pub const ENTRY_TIMESTAMP: &str = "blog-entry-metadata-timestamp";

    /// Presence of this key on an entry disables new comments.
    pub const COMMENTS_DISABLED: &str = "blog-entry-metadata-comments-disabled";

    /// Moderation status of a response (`new`, `approved`, `spam`).
    pub const RESPONSE_STATUS: &str = "blog-response-status";

    /// Address the comment was submitted from.
    pub const RESPONSE_IP: &str = "blog-response-ip";

    /// Set by a submission listener to suppress persistence of a comment.
    pub const COMMENT_DESTROY: &str = "blog-comment-metadata-destroy";

    /// Set to `"true"` by a submission listener to store a comment pre-approved.
    pub const COMMENT_APPROVED: &str = "blog-comment-moderation-approved";

    pub const CATEGORY_NAME: &str = "blog-category-name";
    pub const CATEGORY_DESCRIPTION: &str = "blog-category-description";
}

/// Drop sub-millisecond precision. File modification times and sidecar
/// timestamps are both kept in milliseconds.
pub fn truncate_to_millis(time: DateTime<Utc>) -> DateTime<Utc> {
    millis_to_datetime(time.timestamp_millis())
}

/// Convert epoch milliseconds to a UTC timestamp, clamping out-of-range
/// values to the epoch.
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
