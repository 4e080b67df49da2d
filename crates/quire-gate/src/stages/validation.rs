use crate::error::GateResult;
use crate::stage::{CommentSubmission, DropReason, GateContext, SubmissionStage, StageDecision};

/// Author, body, permalink and category must all be non-blank.
///
/// The root category may be spelled `/`, which counts as present.
pub struct RequiredFieldsStage;

impl SubmissionStage for RequiredFieldsStage {
    fn name(&self) -> &str {
        "required-fields"
    }

    fn evaluate(
        &self,
        submission: &CommentSubmission,
        _context: &mut GateContext<'_>,
    ) -> GateResult<StageDecision> {
        let fields = [
            ("author", &submission.author),
            ("body", &submission.body),
            ("permalink", &submission.permalink),
            ("category", &submission.category),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Ok(StageDecision::Drop(DropReason::MissingField(name)));
            }
        }
        Ok(StageDecision::Pass)
    }
}
