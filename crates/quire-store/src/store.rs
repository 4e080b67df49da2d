use std::path::Path;

use quire_types::{
    BlogConfig, Category, CategoryPath, Comment, Entry, EntryRef, Pingback, ResponseId,
    ResponseStatus, Trackback,
};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::sidecar;
use crate::traits::{Deletable, EntryFilter, Fetcher, Loadable, Savable};

/// Content store backed by a directory tree under the blog's home.
///
/// `FileStore` holds only the immutable blog configuration, so it is cheap
/// to clone and safe to share between threads. All state lives on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
    pub(crate) config: BlogConfig,
}

impl FileStore {
    /// Open a store over an existing blog home directory.
    pub fn open(config: BlogConfig) -> StoreResult<Self> {
        if !config.home().is_dir() {
            return Err(StoreError::Config(format!(
                "blog home is not a directory: {}",
                config.home().display()
            )));
        }
        info!(home = %config.home().display(), "file store opened");
        Ok(Self { config })
    }

    /// Load `blog.properties` and open the store it describes.
    pub fn from_properties_file(path: &Path) -> StoreResult<Self> {
        Self::open(sidecar::load_blog_config(path)?)
    }

    pub fn config(&self) -> &BlogConfig {
        &self.config
    }

    pub fn home(&self) -> &Path {
        self.config.home()
    }
}

impl Fetcher for FileStore {
    fn config(&self) -> &BlogConfig {
        &self.config
    }

    fn load_entry(&self, entry: &EntryRef) -> StoreResult<Entry> {
        Loadable::<Entry>::load(self, entry)
    }

    fn save_entry(&self, entry: &mut Entry) -> StoreResult<EntryRef> {
        Savable::<Entry>::save(self, entry)
    }

    fn delete_entry(&self, entry: &EntryRef) -> StoreResult<()> {
        Deletable::<Entry>::delete(self, entry)
    }

    fn fetch_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<Entry>> {
        self.fetch(filter)
    }

    fn load_category(&self, path: &CategoryPath) -> StoreResult<Category> {
        Loadable::<Category>::load(self, path)
    }

    fn save_category(&self, category: &mut Category) -> StoreResult<CategoryPath> {
        Savable::<Category>::save(self, category)
    }

    fn delete_category(&self, path: &CategoryPath) -> StoreResult<()> {
        Deletable::<Category>::delete(self, path)
    }

    fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.categories()
    }

    fn load_comment(&self, id: &ResponseId) -> StoreResult<Comment> {
        Loadable::<Comment>::load(self, id)
    }

    fn save_comment(&self, comment: &mut Comment) -> StoreResult<ResponseId> {
        Savable::<Comment>::save(self, comment)
    }

    fn delete_comment(&self, id: &ResponseId) -> StoreResult<()> {
        Deletable::<Comment>::delete(self, id)
    }

    fn list_comments(&self, entry: &EntryRef) -> StoreResult<Vec<Comment>> {
        self.list_responses::<Comment>(entry)
    }

    fn load_trackback(&self, id: &ResponseId) -> StoreResult<Trackback> {
        Loadable::<Trackback>::load(self, id)
    }

    fn save_trackback(&self, trackback: &mut Trackback) -> StoreResult<ResponseId> {
        Savable::<Trackback>::save(self, trackback)
    }

    fn delete_trackback(&self, id: &ResponseId) -> StoreResult<()> {
        Deletable::<Trackback>::delete(self, id)
    }

    fn list_trackbacks(&self, entry: &EntryRef) -> StoreResult<Vec<Trackback>> {
        self.list_responses::<Trackback>(entry)
    }

    fn load_pingback(&self, id: &ResponseId) -> StoreResult<Pingback> {
        Loadable::<Pingback>::load(self, id)
    }

    fn save_pingback(&self, pingback: &mut Pingback) -> StoreResult<ResponseId> {
        Savable::<Pingback>::save(self, pingback)
    }

    fn delete_pingback(&self, id: &ResponseId) -> StoreResult<()> {
        Deletable::<Pingback>::delete(self, id)
    }

    fn list_pingbacks(&self, entry: &EntryRef) -> StoreResult<Vec<Pingback>> {
        self.list_responses::<Pingback>(entry)
    }

    fn find_responses_by_status(
        &self,
        statuses: &[ResponseStatus],
    ) -> StoreResult<Vec<ResponseId>> {
        self.responses_with_status(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_requires_existing_home() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileStore::open(BlogConfig::new(dir.path())).is_ok());
        let missing = BlogConfig::new(dir.path().join("missing"));
        assert!(matches!(FileStore::open(missing), Err(StoreError::Config(_))));
    }

    #[test]
    fn opens_from_properties_file() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        std::fs::create_dir(&home).unwrap();
        let props = dir.path().join("blog.properties");
        sidecar::save_blog_config(&props, &BlogConfig::new(&home)).unwrap();

        let store = FileStore::from_properties_file(&props).unwrap();
        assert_eq!(store.home(), home.as_path());
    }

    #[test]
    fn store_is_usable_as_trait_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(BlogConfig::new(dir.path())).unwrap();
        let fetcher: std::sync::Arc<dyn Fetcher> = std::sync::Arc::new(store);
        assert!(fetcher.fetch_entries(&EntryFilter::all()).unwrap().is_empty());
    }
}
