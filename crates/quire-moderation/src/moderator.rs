use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use quire_events::{BlogEvent, EventBroadcaster, EventKind};
use quire_store::{Fetcher, StoreResult, PENDING_STATUSES};
use quire_types::{Response, ResponseId, ResponseKind, ResponseStatus};

use crate::error::ModerationResult;
use crate::summary::ModerationSummary;

/// What to do with each response in a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModerationAction {
    SetStatus(ResponseStatus),
    Delete,
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetStatus(status) => write!(f, "set-status:{}", status.as_str()),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Applies moderation decisions to stored responses.
pub struct ResponseModerator {
    store: Arc<dyn Fetcher>,
    broadcaster: Arc<EventBroadcaster>,
}

impl ResponseModerator {
    pub fn new(store: Arc<dyn Fetcher>, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { store, broadcaster }
    }

    pub fn approve(&self, ids: &[ResponseId]) -> ModerationSummary {
        self.apply(ids, ModerationAction::SetStatus(ResponseStatus::Approved))
    }

    pub fn mark_spam(&self, ids: &[ResponseId]) -> ModerationSummary {
        self.apply(ids, ModerationAction::SetStatus(ResponseStatus::Spam))
    }

    /// Put responses back into the moderation queue.
    pub fn reset(&self, ids: &[ResponseId]) -> ModerationSummary {
        self.apply(ids, ModerationAction::SetStatus(ResponseStatus::New))
    }

    pub fn delete(&self, ids: &[ResponseId]) -> ModerationSummary {
        self.apply(ids, ModerationAction::Delete)
    }

    /// Run `action` over every id. Never fails as a whole; per-item
    /// failures are logged and listed in the summary.
    pub fn apply(&self, ids: &[ResponseId], action: ModerationAction) -> ModerationSummary {
        let mut summary = ModerationSummary::default();
        for id in ids {
            let result = match action {
                ModerationAction::SetStatus(status) => self.set_status(id, status),
                ModerationAction::Delete => self.remove(id),
            };
            match result {
                Ok(()) => {
                    let counts = summary.counts_mut(id.kind);
                    let kind = match action {
                        ModerationAction::SetStatus(ResponseStatus::Approved) => {
                            counts.approved += 1;
                            EventKind::Approved
                        }
                        ModerationAction::SetStatus(ResponseStatus::Spam) => {
                            counts.marked_spam += 1;
                            EventKind::MarkedSpam
                        }
                        ModerationAction::SetStatus(ResponseStatus::New) => {
                            counts.reset += 1;
                            EventKind::Unmoderated
                        }
                        ModerationAction::Delete => {
                            counts.deleted += 1;
                            EventKind::Deleted
                        }
                    };
                    debug!(response = %id, %action, "moderated");
                    self.broadcaster
                        .broadcast(BlogEvent::response(self.blog_id(), kind, id, Utc::now()));
                }
                Err(e) => {
                    warn!(response = %id, %action, error = %e, "skipping response");
                    summary.fail(id, e.to_string());
                }
            }
        }
        info!(
            %action,
            succeeded = summary.succeeded(),
            failed = summary.failures.len(),
            "moderation batch finished"
        );
        summary
    }

    /// Responses still awaiting a decision (status `new` or `spam`).
    pub fn pending(&self) -> ModerationResult<Vec<ResponseId>> {
        Ok(self.store.find_responses_by_status(&PENDING_STATUSES)?)
    }

    fn set_status(&self, id: &ResponseId, status: ResponseStatus) -> StoreResult<()> {
        let store = self.store.as_ref();
        match id.kind {
            ResponseKind::Comment => {
                restatus(id, status, |id| store.load_comment(id), |c| store.save_comment(c))
            }
            ResponseKind::Trackback => {
                restatus(id, status, |id| store.load_trackback(id), |t| store.save_trackback(t))
            }
            ResponseKind::Pingback => {
                restatus(id, status, |id| store.load_pingback(id), |p| store.save_pingback(p))
            }
        }
    }

    fn remove(&self, id: &ResponseId) -> StoreResult<()> {
        match id.kind {
            ResponseKind::Comment => self.store.delete_comment(id),
            ResponseKind::Trackback => self.store.delete_trackback(id),
            ResponseKind::Pingback => self.store.delete_pingback(id),
        }
    }

    fn blog_id(&self) -> String {
        self.store.config().home().display().to_string()
    }
}

/// Load, change status, save in place. The store keeps the original date.
fn restatus<T: Response>(
    id: &ResponseId,
    status: ResponseStatus,
    load: impl FnOnce(&ResponseId) -> StoreResult<T>,
    save: impl FnOnce(&mut T) -> StoreResult<ResponseId>,
) -> StoreResult<()> {
    let mut item = load(id)?;
    item.set_status(status);
    save(&mut item)?;
    Ok(())
}
