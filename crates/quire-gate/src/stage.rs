use std::fmt;

use chrono::{DateTime, Utc};

use quire_store::Fetcher;
use quire_types::{BlogConfig, CategoryPath, Entry, EntryRef, Metadata};

use crate::error::GateResult;
use crate::throttle::{ThrottleMark, ThrottleTable};

// ---------------------------------------------------------------------------
// CommentSubmission
// ---------------------------------------------------------------------------

/// A comment as it arrives from a reader, before any cleanup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommentSubmission {
    /// Category of the target entry, in any slash form.
    pub category: String,
    /// Filename of the target entry.
    pub permalink: String,
    pub author: String,
    pub author_email: String,
    pub author_url: String,
    pub body: String,
    /// Address the request came from.
    pub ip: String,
    /// Extra metadata supplied by the caller, passed on to listeners.
    pub metadata: Metadata,
}

impl CommentSubmission {
    pub fn new(
        category: impl Into<String>,
        permalink: impl Into<String>,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            permalink: permalink.into(),
            author: author.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn from_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.author_email = email.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.author_url = url.into();
        self
    }

    /// The entry this comment is aimed at.
    pub fn entry_ref(&self) -> GateResult<EntryRef> {
        let category = CategoryPath::parse(&self.category)?;
        Ok(EntryRef::new(category, self.permalink.trim())?)
    }
}

// ---------------------------------------------------------------------------
// DropReason / StageDecision
// ---------------------------------------------------------------------------

/// Why a submission was silently discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    CommentsDisabled,
    BannedIp,
    MissingField(&'static str),
    InvalidTarget(String),
    EntryNotFound,
    EntryNotWritable,
    CommentsDisabledForEntry,
    Throttled { retry_after_secs: i64 },
    Expired { age_days: i64 },
    Vetoed,
    Failed(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommentsDisabled => write!(f, "comments are disabled for this blog"),
            Self::BannedIp => write!(f, "address is banned"),
            Self::MissingField(field) => write!(f, "required field '{field}' is blank"),
            Self::InvalidTarget(why) => write!(f, "invalid target: {why}"),
            Self::EntryNotFound => write!(f, "entry does not exist"),
            Self::EntryNotWritable => write!(f, "entry is not writable"),
            Self::CommentsDisabledForEntry => write!(f, "comments are disabled for this entry"),
            Self::Throttled { retry_after_secs } => {
                write!(f, "throttled, retry in {retry_after_secs}s")
            }
            Self::Expired { age_days } => write!(f, "entry is {age_days} days old"),
            Self::Vetoed => write!(f, "vetoed by a submission listener"),
            Self::Failed(why) => write!(f, "failed: {why}"),
        }
    }
}

/// The outcome of a single stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// Proceed to the next stage.
    Pass,
    /// Discard the submission.
    Drop(DropReason),
}

impl StageDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
}

// ---------------------------------------------------------------------------
// GateContext
// ---------------------------------------------------------------------------

/// State shared by the stages of one submission.
pub struct GateContext<'a> {
    pub blog: &'a BlogConfig,
    pub store: &'a dyn Fetcher,
    pub throttle: &'a ThrottleTable,
    /// Time the submission is evaluated at.
    pub now: DateTime<Utc>,
    /// The target entry, once a stage has loaded it.
    pub entry: Option<Entry>,
    /// Throttle record to undo if the comment is not stored.
    pub throttle_mark: Option<ThrottleMark>,
    pub previous_stages: Vec<StageResult>,
}

impl<'a> GateContext<'a> {
    pub fn new(store: &'a dyn Fetcher, throttle: &'a ThrottleTable, now: DateTime<Utc>) -> Self {
        Self {
            blog: store.config(),
            store,
            throttle,
            now,
            entry: None,
            throttle_mark: None,
            previous_stages: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SubmissionStage trait
// ---------------------------------------------------------------------------

/// One check in the submission pipeline.
///
/// Stages run in order and the first drop ends the run.
pub trait SubmissionStage: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(
        &self,
        submission: &CommentSubmission,
        context: &mut GateContext<'_>,
    ) -> GateResult<StageDecision>;
}
