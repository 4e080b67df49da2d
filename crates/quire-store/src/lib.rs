//! Flat-file content store for quire.
//!
//! Entries, categories and responses live as plain files under the blog
//! home, each with an optional `key=value` sidecar:
//!
//! ```text
//! <home>/<category>/<entry>                                  entry content
//! <home>/<category>/<entry><meta-ext>                        entry metadata
//! <home>/<category>/<comments-dir>/<entry>/<HASH>.cmt[.meta]
//! <home>/<category>/<trackbacks-dir>/<entry>/<epoch-ms>.trackback[.meta]
//! <home>/<category>/<pingbacks-dir>/<entry>/<id>.pingback[.meta]
//! <home>/<category>/blojsom<props-ext>                       category metadata
//! ```
//!
//! # Consistency
//!
//! Each file is written through a temp file and renamed into place, but
//! content and sidecar are still two files: a crash between them leaves an
//! entity with stale metadata, which loads as if the metadata were empty.
//! There is no cross-process locking. Concurrent writers to the same
//! entity race and the last rename wins. Entry filenames and pingback ids
//! are claimed with an exclusive create, so two creators never share one.

pub mod codec;
pub mod error;
pub mod fs;
pub mod paths;
pub mod sidecar;
pub mod traits;

mod category;
mod entry;
mod fetch;
mod response;
mod store;

pub use entry::slugify;
pub use error::{StoreError, StoreResult};
pub use fetch::PENDING_STATUSES;
pub use response::{comment_digest, pingback_digest};
pub use store::FileStore;
pub use traits::{Deletable, EntryFilter, Fetcher, Loadable, Savable, Stored};
