use std::fs as stdfs;
use std::io;

use quire_types::{
    keys, CategoryPath, Entry, EntryRef, ResponseId, ResponseKind, ResponseStatus,
};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::paths;
use crate::sidecar;
use crate::store::FileStore;
use crate::traits::{EntryFilter, Loadable};

/// Statuses bulk moderation lists by default.
pub const PENDING_STATUSES: [ResponseStatus; 2] = [ResponseStatus::New, ResponseStatus::Spam];

impl FileStore {
    fn is_entry_name(&self, name: &str) -> bool {
        !name.starts_with('.') && self.config.is_entry_file(name)
    }

    /// Entry files directly inside one category directory.
    fn entry_refs_in(&self, category: &CategoryPath) -> StoreResult<Vec<EntryRef>> {
        let dir = paths::category_dir(self.home(), category);
        let listing = match stdfs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut refs = Vec::new();
        for dirent in listing.flatten() {
            if !dirent.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let name = dirent.file_name().to_string_lossy().into_owned();
            if self.is_entry_name(&name) {
                if let Ok(r) = EntryRef::new(category.clone(), name) {
                    refs.push(r);
                }
            }
        }
        Ok(refs)
    }

    /// Entry files in every category.
    fn all_entry_refs(&self) -> Vec<EntryRef> {
        WalkDir::new(self.home())
            .follow_links(false)
            .into_iter()
            .filter_entry(|d| !d.file_type().is_dir() || self.is_content_dir(d))
            .filter_map(|res| match res {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable path during entry walk");
                    None
                }
            })
            .filter(|d| d.file_type().is_file())
            .filter_map(|d| {
                let name = d.file_name().to_string_lossy().into_owned();
                if !self.is_entry_name(&name) {
                    return None;
                }
                let category = self.category_of(d.path().parent()?)?;
                EntryRef::new(category, name).ok()
            })
            .collect()
    }

    pub(crate) fn fetch(&self, filter: &EntryFilter) -> StoreResult<Vec<Entry>> {
        if let Some(permalink) = &filter.permalink {
            let category = filter.category.clone().unwrap_or_default();
            let key = EntryRef::new(category, permalink.clone())?;
            return match Loadable::<Entry>::load(self, &key) {
                Ok(entry) => Ok(vec![entry]),
                Err(StoreError::NotFound(_)) => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }

        let refs = match &filter.category {
            Some(category) => self.entry_refs_in(category)?,
            None => self.all_entry_refs(),
        };

        let mut entries: Vec<Entry> = refs
            .iter()
            .filter_map(|r| match Loadable::<Entry>::load(self, r) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(entry = %r, error = %e, "skipping entry that failed to load");
                    None
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.created
                .cmp(&a.created)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        if let Some(limit) = filter.limit {
            entries.truncate(limit);
        }

        debug!(count = entries.len(), "entries fetched");
        Ok(entries)
    }

    pub(crate) fn responses_with_status(
        &self,
        statuses: &[ResponseStatus],
    ) -> StoreResult<Vec<ResponseId>> {
        let mut found = Vec::new();

        for category in self.category_paths() {
            let base = paths::category_dir(self.home(), &category);
            for kind in ResponseKind::ALL {
                let root = base.join(self.config.response_directory(kind));
                let Ok(entry_dirs) = stdfs::read_dir(&root) else {
                    continue;
                };
                for entry_dir in entry_dirs.flatten() {
                    if !entry_dir.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                        continue;
                    }
                    let entry_name = entry_dir.file_name().to_string_lossy().into_owned();
                    let Ok(entry) = EntryRef::new(category.clone(), entry_name) else {
                        continue;
                    };
                    let Ok(files) = stdfs::read_dir(entry_dir.path()) else {
                        continue;
                    };

                    for file in files.flatten() {
                        let name = file.file_name().to_string_lossy().into_owned();
                        if ResponseKind::from_filename(&name) != Some(kind) {
                            continue;
                        }
                        let Ok(id) = ResponseId::new(entry.clone(), name) else {
                            continue;
                        };
                        let metadata =
                            match sidecar::load(&paths::response_metadata_path(&file.path())) {
                                Ok(m) => m,
                                Err(e) => {
                                    warn!(response = %id, error = %e, "skipping unreadable sidecar");
                                    continue;
                                }
                            };
                        let status = metadata
                            .get(keys::RESPONSE_STATUS)
                            .and_then(|s| s.parse().ok())
                            .unwrap_or_default();
                        if statuses.contains(&status) {
                            found.push(id);
                        }
                    }
                }
            }
        }

        found.sort();
        Ok(found)
    }
}
