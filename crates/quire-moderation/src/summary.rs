use serde::{Deserialize, Serialize};

use quire_types::{ResponseId, ResponseKind};

/// Default wording of [`ModerationSummary::message`].
///
/// Placeholders `{0}`..`{5}` are comments approved, comments deleted,
/// trackbacks approved, trackbacks deleted, pingbacks approved and
/// pingbacks deleted. `{6}` is the number of failed items.
pub const SUMMARY_TEMPLATE: &str = "Approved {0} comment(s) and deleted {1}. \
Approved {2} trackback(s) and deleted {3}. \
Approved {4} pingback(s) and deleted {5}.";

/// Successes for one response kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub approved: usize,
    pub marked_spam: usize,
    pub reset: usize,
    pub deleted: usize,
}

impl KindCounts {
    pub fn total(&self) -> usize {
        self.approved + self.marked_spam + self.reset + self.deleted
    }
}

/// An item that could not be moderated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationFailure {
    pub id: String,
    pub reason: String,
}

/// Result of one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationSummary {
    pub comments: KindCounts,
    pub trackbacks: KindCounts,
    pub pingbacks: KindCounts,
    pub failures: Vec<ModerationFailure>,
}

impl ModerationSummary {
    pub fn counts(&self, kind: ResponseKind) -> &KindCounts {
        match kind {
            ResponseKind::Comment => &self.comments,
            ResponseKind::Trackback => &self.trackbacks,
            ResponseKind::Pingback => &self.pingbacks,
        }
    }

    pub(crate) fn counts_mut(&mut self, kind: ResponseKind) -> &mut KindCounts {
        match kind {
            ResponseKind::Comment => &mut self.comments,
            ResponseKind::Trackback => &mut self.trackbacks,
            ResponseKind::Pingback => &mut self.pingbacks,
        }
    }

    pub(crate) fn fail(&mut self, id: &ResponseId, reason: impl Into<String>) {
        self.failures.push(ModerationFailure {
            id: id.to_string(),
            reason: reason.into(),
        });
    }

    /// Items handled successfully across all kinds.
    pub fn succeeded(&self) -> usize {
        self.comments.total() + self.trackbacks.total() + self.pingbacks.total()
    }

    /// The summary in the default wording.
    pub fn message(&self) -> String {
        self.format(SUMMARY_TEMPLATE)
    }

    /// Fill a translated template using the placeholders of
    /// [`SUMMARY_TEMPLATE`].
    pub fn format(&self, template: &str) -> String {
        let values = [
            self.comments.approved,
            self.comments.deleted,
            self.trackbacks.approved,
            self.trackbacks.deleted,
            self.pingbacks.approved,
            self.pingbacks.deleted,
            self.failures.len(),
        ];
        values
            .iter()
            .enumerate()
            .fold(template.to_string(), |text, (i, value)| {
                text.replace(&format!("{{{i}}}"), &value.to_string())
            })
    }
}
