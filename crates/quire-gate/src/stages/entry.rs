use quire_store::StoreError;

use crate::error::GateResult;
use crate::stage::{CommentSubmission, DropReason, GateContext, SubmissionStage, StageDecision};

/// Loads the target entry and checks that it takes comments.
///
/// The entry must exist, its file must be writable and its metadata must
/// not switch comments off. The loaded entry is kept in the context.
pub struct EntryStage;

impl SubmissionStage for EntryStage {
    fn name(&self) -> &str {
        "entry"
    }

    fn evaluate(
        &self,
        submission: &CommentSubmission,
        context: &mut GateContext<'_>,
    ) -> GateResult<StageDecision> {
        let target = match submission.entry_ref() {
            Ok(target) => target,
            Err(e) => return Ok(StageDecision::Drop(DropReason::InvalidTarget(e.to_string()))),
        };
        let entry = match context.store.load_entry(&target) {
            Ok(entry) => entry,
            Err(StoreError::NotFound(_)) => return Ok(StageDecision::Drop(DropReason::EntryNotFound)),
            Err(e) => return Err(e.into()),
        };

        let decision = if !entry.supports_comments() {
            StageDecision::Drop(DropReason::EntryNotWritable)
        } else if entry.comments_disabled() {
            StageDecision::Drop(DropReason::CommentsDisabledForEntry)
        } else {
            StageDecision::Pass
        };
        context.entry = Some(entry);
        Ok(decision)
    }
}

/// Closes comments on entries older than the blog's expiration setting.
pub struct ExpirationStage;

impl SubmissionStage for ExpirationStage {
    fn name(&self) -> &str {
        "expiration"
    }

    fn evaluate(
        &self,
        _submission: &CommentSubmission,
        context: &mut GateContext<'_>,
    ) -> GateResult<StageDecision> {
        let Some(days) = context.blog.comment_expiration_days else {
            return Ok(StageDecision::Pass);
        };
        let Some(entry) = context.entry.as_ref() else {
            return Ok(StageDecision::Pass);
        };
        let age_days = entry.age_days(context.now);
        if age_days >= i64::from(days) {
            Ok(StageDecision::Drop(DropReason::Expired { age_days }))
        } else {
            Ok(StageDecision::Pass)
        }
    }
}
