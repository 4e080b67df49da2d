use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use quire_events::{BlogEvent, EventBroadcaster, SubmissionEvent};
use quire_store::Fetcher;
use quire_types::{
    keys, truncate_to_millis, Comment, EntryRef, Response, ResponseId, ResponseStatus,
};

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::sanitize::{self, Sanitizer};
use crate::stage::{
    CommentSubmission, DropReason, GateContext, StageDecision, StageResult, SubmissionStage,
};
use crate::stages::{
    BannedIpStage, CommentsEnabledStage, EntryStage, ExpirationStage, RequiredFieldsStage,
    ThrottleStage,
};
use crate::throttle::ThrottleTable;

/// What became of a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The comment was stored and announced.
    Accepted { id: ResponseId, comment: Box<Comment> },
    /// The comment was discarded; nothing was stored.
    Dropped { stage: String, reason: DropReason },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    fn dropped(stage: &str, reason: DropReason) -> Self {
        Self::Dropped {
            stage: stage.to_string(),
            reason,
        }
    }
}

/// Turns reader submissions into stored comments.
///
/// Stages run fail-fast in order. A submission that clears every stage is
/// cleaned up, handed to the pre-persist listeners, stored, and announced
/// with one `CommentAdded` event. Failures of any kind end in
/// [`SubmissionOutcome::Dropped`]; nothing is surfaced to the submitter.
pub struct CommentPipeline {
    store: Arc<dyn Fetcher>,
    broadcaster: Arc<EventBroadcaster>,
    throttle: ThrottleTable,
    clock: Arc<dyn Clock>,
    sanitizer: Sanitizer,
    stages: Vec<Box<dyn SubmissionStage>>,
}

impl CommentPipeline {
    /// A pipeline with no stages.
    pub fn new(store: Arc<dyn Fetcher>, broadcaster: Arc<EventBroadcaster>, config: &GateConfig) -> Self {
        Self {
            store,
            broadcaster,
            throttle: ThrottleTable::new(),
            clock: Arc::new(SystemClock),
            sanitizer: Sanitizer::new(config),
            stages: Vec::new(),
        }
    }

    /// The standard checks:
    /// enabled -> banned ip -> required fields -> entry -> throttle -> expiration
    pub fn with_default_stages(
        store: Arc<dyn Fetcher>,
        broadcaster: Arc<EventBroadcaster>,
        config: &GateConfig,
    ) -> Self {
        let mut pipeline = Self::new(store, broadcaster, config);
        pipeline.add_stage(Box::new(CommentsEnabledStage));
        pipeline.add_stage(Box::new(BannedIpStage));
        pipeline.add_stage(Box::new(RequiredFieldsStage));
        pipeline.add_stage(Box::new(EntryStage));
        pipeline.add_stage(Box::new(ThrottleStage));
        pipeline.add_stage(Box::new(ExpirationStage));
        pipeline
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn add_stage(&mut self, stage: Box<dyn SubmissionStage>) {
        self.stages.push(stage);
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn throttle(&self) -> &ThrottleTable {
        &self.throttle
    }

    pub fn submit(&self, submission: CommentSubmission) -> SubmissionOutcome {
        let now = truncate_to_millis(self.clock.now());
        let mut context = GateContext::new(self.store.as_ref(), &self.throttle, now);

        for stage in &self.stages {
            let decision = match stage.evaluate(&submission, &mut context) {
                Ok(decision) => decision,
                Err(e) => {
                    error!(stage = stage.name(), error = %e, "submission stage failed");
                    self.rollback(&context);
                    return SubmissionOutcome::dropped(stage.name(), DropReason::Failed(e.to_string()));
                }
            };
            context.previous_stages.push(StageResult {
                stage_name: stage.name().to_string(),
                passed: decision.is_pass(),
            });
            if let StageDecision::Drop(reason) = decision {
                debug!(stage = stage.name(), ip = %submission.ip, %reason, "comment dropped");
                self.rollback(&context);
                return SubmissionOutcome::dropped(stage.name(), reason);
            }
        }

        let target = match submission.entry_ref() {
            Ok(target) => target,
            Err(e) => {
                self.rollback(&context);
                return SubmissionOutcome::dropped("target", DropReason::InvalidTarget(e.to_string()));
            }
        };
        let entry = match context.entry.take() {
            Some(entry) => entry,
            None => match self.store.load_entry(&target) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(entry = %target, error = %e, "comment target not loadable");
                    self.rollback(&context);
                    return SubmissionOutcome::dropped("target", DropReason::EntryNotFound);
                }
            },
        };

        let mut event = self.prepare(&submission, target, now);
        self.broadcaster.process(&mut event);
        if event.is_destroyed() {
            debug!(entry = %event.entry, "comment vetoed by listener");
            self.rollback(&context);
            return SubmissionOutcome::dropped("listeners", DropReason::Vetoed);
        }

        let mut comment = Self::into_comment(event);
        let id = match self.store.save_comment(&mut comment) {
            Ok(id) => id,
            Err(e) => {
                error!(entry = %comment.entry, error = %e, "failed to store comment");
                self.rollback(&context);
                return SubmissionOutcome::dropped("persist", DropReason::Failed(e.to_string()));
            }
        };

        info!(comment = %id, status = comment.status().as_str(), "comment accepted");
        self.broadcaster.broadcast(BlogEvent::comment_added(
            self.blog_id(),
            &id,
            comment.clone(),
            entry,
            now,
        ));
        SubmissionOutcome::Accepted {
            id,
            comment: Box::new(comment),
        }
    }

    /// Cleaned-up fields, ready for the listeners.
    fn prepare(
        &self,
        submission: &CommentSubmission,
        target: EntryRef,
        now: DateTime<Utc>,
    ) -> SubmissionEvent {
        let mut body = submission.body.trim().to_string();
        if self.store.config().comment_autoformat {
            body = sanitize::autoformat(&body);
        }
        SubmissionEvent {
            blog: self.blog_id(),
            entry: target,
            ip: submission.ip.trim().to_string(),
            author: sanitize::clean_field(&submission.author),
            author_email: sanitize::clean_field(&submission.author_email),
            author_url: sanitize::normalize_url(&submission.author_url),
            body: self.sanitizer.sanitize(&body),
            metadata: submission.metadata.clone(),
            timestamp: now,
        }
    }

    fn into_comment(event: SubmissionEvent) -> Comment {
        let status = if event.is_preapproved() {
            ResponseStatus::Approved
        } else {
            ResponseStatus::New
        };
        let mut comment = Comment::new(
            event.entry,
            event.author,
            event.author_email,
            event.author_url,
            event.body,
        );
        comment.date = event.timestamp;
        comment.metadata = event.metadata;
        comment.metadata.insert(keys::RESPONSE_IP.to_string(), event.ip);
        comment.set_status(status);
        comment
    }

    fn rollback(&self, context: &GateContext<'_>) {
        if let Some(mark) = &context.throttle_mark {
            self.throttle.rollback(mark);
        }
    }

    fn blog_id(&self) -> String {
        self.store.config().home().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use quire_events::{EventFilter, SubmissionListener};
    use quire_store::{comment_digest, FileStore};
    use quire_types::{BlogConfig, CategoryPath, Entry};

    use super::*;
    use crate::clock::ManualClock;

    struct Harness {
        _dir: tempfile::TempDir,
        store: Arc<dyn Fetcher>,
        broadcaster: Arc<EventBroadcaster>,
        clock: Arc<ManualClock>,
        pipeline: CommentPipeline,
        entry: Entry,
    }

    fn harness_with(configure: impl FnOnce(&mut BlogConfig), prepare: impl FnOnce(&mut Entry)) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BlogConfig::new(dir.path());
        config.comment_throttle_minutes = Some(5);
        configure(&mut config);
        let store: Arc<dyn Fetcher> = Arc::new(FileStore::open(config).unwrap());

        let mut entry = Entry::new(CategoryPath::parse("news").unwrap(), "Post", "body");
        prepare(&mut entry);
        store.save_entry(&mut entry).unwrap();

        let broadcaster = Arc::new(EventBroadcaster::new());
        let clock = Arc::new(ManualClock::new(entry.created + Duration::hours(1)));
        let pipeline = CommentPipeline::with_default_stages(
            Arc::clone(&store),
            Arc::clone(&broadcaster),
            &GateConfig::default(),
        )
        .with_clock(clock.clone());
        Harness {
            _dir: dir,
            store,
            broadcaster,
            clock,
            pipeline,
            entry,
        }
    }

    fn harness() -> Harness {
        harness_with(|_| {}, |_| {})
    }

    fn submission(author: &str, body: &str) -> CommentSubmission {
        CommentSubmission::new("/news/", "post.txt", author, body).from_ip("10.0.0.1")
    }

    fn stored(h: &Harness) -> Vec<Comment> {
        h.store.list_comments(&h.entry.entry_ref().unwrap()).unwrap()
    }

    fn dropped_reason(outcome: SubmissionOutcome) -> DropReason {
        match outcome {
            SubmissionOutcome::Dropped { reason, .. } => reason,
            SubmissionOutcome::Accepted { id, .. } => panic!("unexpectedly accepted {id}"),
        }
    }

    struct Veto;

    impl SubmissionListener for Veto {
        fn name(&self) -> &str {
            "veto"
        }

        fn process(&self, event: &mut SubmissionEvent) {
            if event.body.contains("spam") {
                event.destroy();
            }
        }
    }

    struct TrustJane;

    impl SubmissionListener for TrustJane {
        fn name(&self) -> &str {
            "trust-jane"
        }

        fn process(&self, event: &mut SubmissionEvent) {
            if event.author == "Jane" {
                event.approve();
            }
        }
    }

    // ---------------------------------------------------------------
    // Accepted submissions
    // ---------------------------------------------------------------

    #[test]
    fn accepted_comment_is_escaped_addressed_and_announced_once() {
        let h = harness();
        let mut events = h.broadcaster.subscribe(EventFilter::default());

        let outcome = h.pipeline.submit(submission("Jane", "Hello <script>x</script>"));
        let SubmissionOutcome::Accepted { id, comment } = outcome else {
            panic!("comment dropped");
        };

        assert_eq!(comment.body, "Hello &lt;script&gt;x&lt;/script&gt;");
        assert!(!comment.body.contains("<script>"));
        assert_eq!(id.filename, format!("{}.cmt", comment_digest("Jane", &comment.body)));
        assert_eq!(comment.status(), ResponseStatus::New);
        assert_eq!(comment.ip(), Some("10.0.0.1"));

        let event = events.try_next().unwrap().unwrap();
        assert_eq!(event.name(), "CommentAdded");
        assert_eq!(event.entry_ref, h.entry.entry_ref());
        assert_eq!(events.try_next().unwrap(), None);

        let on_disk = stored(&h);
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].body, comment.body);
    }

    #[test]
    fn whitelisted_markup_survives_storage() {
        let h = harness();
        let outcome = h.pipeline.submit(submission("Jane", "<script>alert(1)</script><b>ok</b>"));
        assert!(outcome.is_accepted());
        let body = &stored(&h)[0].body;
        assert_eq!(body, "&lt;script&gt;alert(1)&lt;/script&gt;<b>ok</b>");
    }

    #[test]
    fn author_fields_are_cleaned() {
        let h = harness();
        let sub = submission("  Jane\n<Doe> ", "hi")
            .with_email(" jane@example.org ")
            .with_url("example.org");
        let SubmissionOutcome::Accepted { comment, .. } = h.pipeline.submit(sub) else {
            panic!("comment dropped");
        };
        assert_eq!(comment.author, "Jane&lt;Doe&gt;");
        assert_eq!(comment.author_email, "jane@example.org");
        assert_eq!(comment.author_url, "http://example.org");
    }

    #[test]
    fn autoformat_turns_newlines_into_breaks() {
        let h = harness_with(|c| c.comment_autoformat = true, |_| {});
        let SubmissionOutcome::Accepted { comment, .. } = h.pipeline.submit(submission("A", "one\ntwo")) else {
            panic!("comment dropped");
        };
        assert_eq!(comment.body, "one<br />two");
    }

    #[test]
    fn listener_can_preapprove() {
        let h = harness();
        h.broadcaster.add_listener(Arc::new(TrustJane));
        let SubmissionOutcome::Accepted { comment, .. } = h.pipeline.submit(submission("Jane", "hi")) else {
            panic!("comment dropped");
        };
        assert_eq!(comment.status(), ResponseStatus::Approved);
        assert_eq!(stored(&h)[0].status(), ResponseStatus::Approved);
    }

    // ---------------------------------------------------------------
    // Throttling
    // ---------------------------------------------------------------

    #[test]
    fn throttle_window_is_enforced_and_expires() {
        let h = harness();
        assert!(h.pipeline.submit(submission("A", "first")).is_accepted());

        h.clock.advance(Duration::minutes(1));
        let reason = dropped_reason(h.pipeline.submit(submission("A", "second")));
        assert!(matches!(reason, DropReason::Throttled { .. }));
        assert_eq!(stored(&h).len(), 1);

        h.clock.advance(Duration::minutes(4) + Duration::seconds(1));
        assert!(h.pipeline.submit(submission("A", "third")).is_accepted());
        assert_eq!(stored(&h).len(), 2);
    }

    #[test]
    fn other_addresses_are_not_throttled() {
        let h = harness();
        assert!(h.pipeline.submit(submission("A", "first")).is_accepted());
        let other = submission("B", "second").from_ip("10.0.0.2");
        assert!(h.pipeline.submit(other).is_accepted());
    }

    #[test]
    fn throttling_off_when_unset() {
        let h = harness_with(|c| c.comment_throttle_minutes = None, |_| {});
        assert!(h.pipeline.submit(submission("A", "first")).is_accepted());
        assert!(h.pipeline.submit(submission("A", "second")).is_accepted());
        assert!(h.pipeline.throttle().is_empty());
    }

    #[test]
    fn vetoed_comment_does_not_start_the_window() {
        let h = harness();
        h.broadcaster.add_listener(Arc::new(Veto));
        assert_eq!(
            dropped_reason(h.pipeline.submit(submission("A", "buy spam"))),
            DropReason::Vetoed
        );
        assert!(stored(&h).is_empty());
        assert!(h.pipeline.submit(submission("A", "honest words")).is_accepted());
    }

    // ---------------------------------------------------------------
    // Silent drops
    // ---------------------------------------------------------------

    #[test]
    fn blog_with_comments_off_drops() {
        let h = harness_with(|c| c.comments_enabled = false, |_| {});
        assert_eq!(
            dropped_reason(h.pipeline.submit(submission("A", "b"))),
            DropReason::CommentsDisabled
        );
    }

    #[test]
    fn banned_address_drops() {
        let h = harness_with(|c| c.banned_ips = vec!["10.0.0.1".into()], |_| {});
        assert_eq!(
            dropped_reason(h.pipeline.submit(submission("A", "b"))),
            DropReason::BannedIp
        );
    }

    #[test]
    fn blank_required_field_drops() {
        let h = harness();
        assert_eq!(
            dropped_reason(h.pipeline.submit(submission("   ", "b"))),
            DropReason::MissingField("author")
        );
        assert_eq!(
            dropped_reason(h.pipeline.submit(submission("A", "\n"))),
            DropReason::MissingField("body")
        );
    }

    #[test]
    fn unknown_entry_drops_without_writing() {
        let h = harness();
        let sub = CommentSubmission::new("news", "missing.txt", "A", "b").from_ip("1.1.1.1");
        assert_eq!(dropped_reason(h.pipeline.submit(sub)), DropReason::EntryNotFound);
        assert!(h.pipeline.throttle().is_empty());
    }

    #[test]
    fn traversal_target_drops() {
        let h = harness();
        let sub = CommentSubmission::new("../etc", "passwd", "A", "b");
        assert!(matches!(
            dropped_reason(h.pipeline.submit(sub)),
            DropReason::InvalidTarget(_)
        ));
    }

    #[test]
    fn entry_metadata_can_close_comments() {
        let h = harness_with(
            |_| {},
            |e| {
                e.metadata
                    .insert(quire_types::keys::COMMENTS_DISABLED.into(), "y".into());
            },
        );
        assert_eq!(
            dropped_reason(h.pipeline.submit(submission("A", "b"))),
            DropReason::CommentsDisabledForEntry
        );
    }

    #[test]
    fn read_only_entry_drops() {
        let h = harness();
        let path = h.store.config().home().join("news/post.txt");
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&path, perms).unwrap();

        assert_eq!(
            dropped_reason(h.pipeline.submit(submission("A", "b"))),
            DropReason::EntryNotWritable
        );
    }

    #[test]
    fn edited_read_only_entry_still_drops() {
        let h = harness();
        let path = h.store.config().home().join("news/post.txt");
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&path, perms).unwrap();

        let mut entry = h.store.load_entry(&h.entry.entry_ref().unwrap()).unwrap();
        entry.body = "edited".into();
        h.store.save_entry(&mut entry).unwrap();

        assert_eq!(
            dropped_reason(h.pipeline.submit(submission("A", "b"))),
            DropReason::EntryNotWritable
        );
    }

    #[test]
    fn large_throttle_table_sheds_expired_addresses() {
        let h = harness();
        let long_ago = h.clock.now() - Duration::minutes(10);
        for n in 0..crate::throttle::PRUNE_THRESHOLD {
            h.pipeline
                .throttle()
                .check_and_record(&format!("192.0.2.{n}"), long_ago, Duration::minutes(5));
        }

        assert!(h.pipeline.submit(submission("A", "b")).is_accepted());
        assert_eq!(h.pipeline.throttle().len(), 1);
        assert!(h.pipeline.throttle().last_seen("10.0.0.1").is_some());
    }

    #[test]
    fn old_entry_drops_and_releases_throttle() {
        let h = harness_with(|c| c.comment_expiration_days = Some(7), |_| {});
        h.clock.advance(Duration::days(8));
        assert!(matches!(
            dropped_reason(h.pipeline.submit(submission("A", "b"))),
            DropReason::Expired { .. }
        ));
        assert!(h.pipeline.throttle().is_empty());
    }

    #[test]
    fn young_entry_accepts() {
        let h = harness_with(|c| c.comment_expiration_days = Some(7), |_| {});
        h.clock.advance(Duration::days(6));
        assert!(h.pipeline.submit(submission("A", "b")).is_accepted());
    }

    #[test]
    fn no_event_for_dropped_comment() {
        let h = harness_with(|c| c.comments_enabled = false, |_| {});
        let mut events = h.broadcaster.subscribe(EventFilter::default());
        h.pipeline.submit(submission("A", "b"));
        assert_eq!(events.try_next().unwrap(), None);
    }

    #[test]
    fn default_pipeline_stage_count() {
        let h = harness();
        assert_eq!(h.pipeline.stage_count(), 6);
    }
}
