use quire_types::{
    BlogConfig, Category, CategoryPath, Comment, Entry, EntryRef, Pingback, ResponseId,
    ResponseStatus, Trackback,
};

use crate::error::StoreResult;

/// An entity kind the store knows how to persist, and the key that
/// addresses it.
pub trait Stored {
    type Key;
}

impl Stored for Entry {
    type Key = EntryRef;
}

impl Stored for Category {
    type Key = CategoryPath;
}

impl Stored for Comment {
    type Key = ResponseId;
}

impl Stored for Trackback {
    type Key = ResponseId;
}

impl Stored for Pingback {
    type Key = ResponseId;
}

/// Read an entity by key. Fails with `NotFound` if its primary file is absent.
pub trait Loadable<T: Stored> {
    fn load(&self, key: &T::Key) -> StoreResult<T>;
}

/// Persist an entity, assigning its identity on first save.
pub trait Savable<T: Stored> {
    fn save(&self, item: &mut T) -> StoreResult<T::Key>;
}

/// Remove an entity. Fails with `NotFound` if its primary file is absent.
pub trait Deletable<T: Stored> {
    fn delete(&self, key: &T::Key) -> StoreResult<()>;
}

/// Selection for [`Fetcher::fetch_entries`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Restrict to one category (non-recursive). `None` walks every category.
    pub category: Option<CategoryPath>,
    /// Look up a single entry by filename within `category` (root if unset).
    pub permalink: Option<String>,
    /// Keep at most this many entries, newest first.
    pub limit: Option<usize>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(category: CategoryPath) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    pub fn permalink(category: CategoryPath, filename: impl Into<String>) -> Self {
        Self {
            category: Some(category),
            permalink: Some(filename.into()),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The content store boundary used by the submission pipeline, moderation
/// and any outer surface.
///
/// Implementations must be safe to share across request threads. They
/// provide no locking beyond what the filesystem gives: concurrent writers
/// to the same entity race, last write wins.
pub trait Fetcher: Send + Sync {
    fn config(&self) -> &BlogConfig;

    fn load_entry(&self, entry: &EntryRef) -> StoreResult<Entry>;
    fn save_entry(&self, entry: &mut Entry) -> StoreResult<EntryRef>;
    fn delete_entry(&self, entry: &EntryRef) -> StoreResult<()>;
    fn fetch_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<Entry>>;

    fn load_category(&self, path: &CategoryPath) -> StoreResult<Category>;
    fn save_category(&self, category: &mut Category) -> StoreResult<CategoryPath>;
    fn delete_category(&self, path: &CategoryPath) -> StoreResult<()>;
    fn list_categories(&self) -> StoreResult<Vec<Category>>;

    fn load_comment(&self, id: &ResponseId) -> StoreResult<Comment>;
    fn save_comment(&self, comment: &mut Comment) -> StoreResult<ResponseId>;
    fn delete_comment(&self, id: &ResponseId) -> StoreResult<()>;
    fn list_comments(&self, entry: &EntryRef) -> StoreResult<Vec<Comment>>;

    fn load_trackback(&self, id: &ResponseId) -> StoreResult<Trackback>;
    fn save_trackback(&self, trackback: &mut Trackback) -> StoreResult<ResponseId>;
    fn delete_trackback(&self, id: &ResponseId) -> StoreResult<()>;
    fn list_trackbacks(&self, entry: &EntryRef) -> StoreResult<Vec<Trackback>>;

    fn load_pingback(&self, id: &ResponseId) -> StoreResult<Pingback>;
    fn save_pingback(&self, pingback: &mut Pingback) -> StoreResult<ResponseId>;
    fn delete_pingback(&self, id: &ResponseId) -> StoreResult<()>;
    fn list_pingbacks(&self, entry: &EntryRef) -> StoreResult<Vec<Pingback>>;

    /// Every stored response whose status is one of `statuses`.
    fn find_responses_by_status(&self, statuses: &[ResponseStatus])
        -> StoreResult<Vec<ResponseId>>;
}
