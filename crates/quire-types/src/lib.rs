//! Foundation types for quire, a flat-file blog content store.
//!
//! Every other quire crate depends on `quire-types`. Nothing here touches the
//! filesystem; the types describe *what* is stored; `quire-store` decides
//! *where* and *how*.
//!
//! # Key Types
//!
//! - [`BlogConfig`]: per-tenant configuration loaded from `blog.properties`
//! - [`CategoryPath`]: normalized category directory (`""` or `"a/b/"`)
//! - [`Entry`] / [`EntryRef`]: a blog post and its stable identity
//! - [`Comment`], [`Trackback`], [`Pingback`]: responses attached to an entry
//! - [`ResponseId`]: textual identity of any response, used by moderation
//! - [`Metadata`]: the string-keyed property map stored in sidecar files

pub mod blog;
pub mod category;
pub mod entry;
pub mod error;
pub mod metadata;
pub mod properties;
pub mod response;

pub use blog::{settings, BlogConfig, DEFAULT_THROTTLE_MINUTES};
pub use category::{Category, CategoryPath};
pub use entry::{Entry, EntryRef};
pub use error::TypeError;
pub use metadata::{keys, millis_to_datetime, truncate_to_millis, Metadata};
pub use response::{
    Comment, Pingback, Response, ResponseId, ResponseKind, ResponseStatus, Trackback,
};
