//! Comment submission pipeline for quire.
//!
//! A reader's comment passes a fail-fast chain of stages (blog enabled,
//! banned address, required fields, target entry, throttle, expiration),
//! is trimmed and sanitized, goes through the pre-persist listeners, and
//! is then stored and announced. Anything that fails is dropped without
//! telling the submitter why.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quire_events::EventBroadcaster;
//! use quire_gate::{CommentPipeline, CommentSubmission, GateConfig};
//! use quire_store::{Fetcher, FileStore};
//! use quire_types::BlogConfig;
//!
//! let store: Arc<dyn Fetcher> = Arc::new(FileStore::open(BlogConfig::new("/srv/blog")).unwrap());
//! let pipeline = CommentPipeline::with_default_stages(
//!     store,
//!     Arc::new(EventBroadcaster::new()),
//!     &GateConfig::default(),
//! );
//! let outcome = pipeline.submit(
//!     CommentSubmission::new("news", "hello.txt", "Jane", "Nice post").from_ip("192.0.2.7"),
//! );
//! println!("{outcome:?}");
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sanitize;
pub mod stage;
pub mod stages;
pub mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use pipeline::{CommentPipeline, SubmissionOutcome};
pub use sanitize::{AllowedTag, Sanitizer};
pub use stage::{
    CommentSubmission, DropReason, GateContext, StageDecision, StageResult, SubmissionStage,
};
pub use stages::{
    BannedIpStage, CommentsEnabledStage, EntryStage, ExpirationStage, RequiredFieldsStage,
    ThrottleStage,
};
pub use throttle::{ThrottleDecision, ThrottleMark, ThrottleTable, PRUNE_THRESHOLD};
