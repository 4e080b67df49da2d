use crate::error::GateResult;
use crate::stage::{CommentSubmission, DropReason, GateContext, SubmissionStage, StageDecision};

/// Drops everything while the blog has comments switched off.
pub struct CommentsEnabledStage;

impl SubmissionStage for CommentsEnabledStage {
    fn name(&self) -> &str {
        "comments-enabled"
    }

    fn evaluate(
        &self,
        _submission: &CommentSubmission,
        context: &mut GateContext<'_>,
    ) -> GateResult<StageDecision> {
        if context.blog.comments_enabled {
            Ok(StageDecision::Pass)
        } else {
            Ok(StageDecision::Drop(DropReason::CommentsDisabled))
        }
    }
}

/// Drops submissions from addresses on the blog's ban list.
pub struct BannedIpStage;

impl SubmissionStage for BannedIpStage {
    fn name(&self) -> &str {
        "banned-ip"
    }

    fn evaluate(
        &self,
        submission: &CommentSubmission,
        context: &mut GateContext<'_>,
    ) -> GateResult<StageDecision> {
        if context.blog.is_banned(submission.ip.trim()) {
            Ok(StageDecision::Drop(DropReason::BannedIp))
        } else {
            Ok(StageDecision::Pass)
        }
    }
}
