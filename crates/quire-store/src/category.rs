use std::fs as stdfs;
use std::path::Path;

use quire_types::{Category, CategoryPath};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{StoreError, StoreResult};
use crate::paths;
use crate::sidecar;
use crate::store::FileStore;
use crate::traits::{Deletable, Loadable, Savable};

impl FileStore {
    /// Whether a walk should descend into `dirent`. Hidden directories and
    /// response directories never hold categories or entries.
    pub(crate) fn is_content_dir(&self, dirent: &DirEntry) -> bool {
        if dirent.depth() == 0 {
            return true;
        }
        let name = dirent.file_name().to_string_lossy();
        !(name.starts_with('.') || self.config.is_response_directory(&name))
    }

    /// Category path of a directory under blog home.
    pub(crate) fn category_of(&self, dir: &Path) -> Option<CategoryPath> {
        let relative = dir.strip_prefix(self.home()).ok()?;
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        CategoryPath::parse(&joined).ok()
    }

    /// Every category directory under blog home, root included, sorted.
    pub(crate) fn category_paths(&self) -> Vec<CategoryPath> {
        let mut found: Vec<CategoryPath> = WalkDir::new(self.home())
            .follow_links(false)
            .into_iter()
            .filter_entry(|d| d.file_type().is_dir() && self.is_content_dir(d))
            .filter_map(|res| match res {
                Ok(d) => self.category_of(d.path()),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable category directory");
                    None
                }
            })
            .collect();
        found.sort();
        found
    }

    pub(crate) fn categories(&self) -> StoreResult<Vec<Category>> {
        let mut out = Vec::new();
        for path in self.category_paths() {
            match Loadable::<Category>::load(self, &path) {
                Ok(category) => out.push(category),
                Err(e) => warn!(category = %path, error = %e, "skipping category that failed to load"),
            }
        }
        Ok(out)
    }
}

impl Loadable<Category> for FileStore {
    fn load(&self, key: &CategoryPath) -> StoreResult<Category> {
        let dir = paths::category_dir(self.home(), key);
        if !dir.is_dir() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let metadata = sidecar::load(&paths::category_meta_file(&self.config, key))?;
        Ok(Category {
            path: key.clone(),
            metadata,
        })
    }
}

impl Savable<Category> for FileStore {
    fn save(&self, category: &mut Category) -> StoreResult<CategoryPath> {
        stdfs::create_dir_all(paths::category_dir(self.home(), &category.path))?;
        sidecar::save(
            &paths::category_meta_file(&self.config, &category.path),
            &category.metadata,
        )?;
        info!(category = %category.path, "category saved");
        Ok(category.path.clone())
    }
}

impl Deletable<Category> for FileStore {
    /// Deleting a category removes its directory tree. The root category is
    /// emptied instead; blog home itself stays.
    fn delete(&self, key: &CategoryPath) -> StoreResult<()> {
        let dir = paths::category_dir(self.home(), key);
        if !dir.is_dir() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        if key.is_root() {
            for child in stdfs::read_dir(&dir)? {
                let child = child?;
                if child.file_type()?.is_dir() {
                    stdfs::remove_dir_all(child.path())?;
                } else {
                    stdfs::remove_file(child.path())?;
                }
            }
        } else {
            stdfs::remove_dir_all(&dir)?;
        }

        info!(category = %key, "category deleted");
        Ok(())
    }
}
