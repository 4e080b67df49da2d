use chrono::Duration;
use tracing::debug;

use crate::error::GateResult;
use crate::stage::{CommentSubmission, DropReason, GateContext, SubmissionStage, StageDecision};
use crate::throttle::{ThrottleDecision, PRUNE_THRESHOLD};

/// Enforces the per-address comment window.
///
/// Passing records the attempt; the pipeline undoes the record if the
/// comment is dropped later on. Once the table holds [`PRUNE_THRESHOLD`]
/// addresses, expired ones are swept before the check.
pub struct ThrottleStage;

impl SubmissionStage for ThrottleStage {
    fn name(&self) -> &str {
        "throttle"
    }

    fn evaluate(
        &self,
        submission: &CommentSubmission,
        context: &mut GateContext<'_>,
    ) -> GateResult<StageDecision> {
        let Some(minutes) = context.blog.comment_throttle_minutes else {
            return Ok(StageDecision::Pass);
        };
        let window = Duration::minutes(i64::from(minutes));
        if context.throttle.len() >= PRUNE_THRESHOLD {
            let removed = context.throttle.prune(context.now, window);
            debug!(removed, "pruned expired throttle entries");
        }
        let ip = submission.ip.trim();
        match context.throttle.check_and_record(ip, context.now, window) {
            ThrottleDecision::Allowed(mark) => {
                context.throttle_mark = Some(mark);
                Ok(StageDecision::Pass)
            }
            ThrottleDecision::Throttled { retry_after } => {
                debug!(ip = %ip, retry_after_secs = retry_after.num_seconds(), "comment throttled");
                Ok(StageDecision::Drop(DropReason::Throttled {
                    retry_after_secs: retry_after.num_seconds(),
                }))
            }
        }
    }
}
