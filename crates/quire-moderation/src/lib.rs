//! Bulk moderation of comments, trackbacks and pingbacks.
//!
//! A batch is a list of response ids plus one action. Each id is handled
//! on its own: a missing or unreadable response is logged and skipped and
//! the rest of the batch still runs. Every change is announced on the
//! event broadcaster.

pub mod error;
pub mod moderator;
pub mod summary;

pub use error::{ModerationError, ModerationResult};
pub use moderator::{ModerationAction, ResponseModerator};
pub use summary::{KindCounts, ModerationFailure, ModerationSummary, SUMMARY_TEMPLATE};
