use std::fs as stdfs;
use std::io;
use std::path::Path;

use quire_types::{
    keys, millis_to_datetime, truncate_to_millis, Comment, Entry, EntryRef, Pingback,
    ResponseKind, Trackback,
};
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::fs;
use crate::paths;
use crate::response::ResponseFile;
use crate::sidecar;
use crate::store::FileStore;
use crate::traits::{Deletable, Loadable, Savable};

/// Longest slug derived from a title, before extension and suffix.
const MAX_SLUG_LEN: usize = 64;

/// Give up looking for a free `-N` suffix after this many attempts.
const MAX_SUFFIX: u32 = 10_000;

/// Derive a filename stem from a title: lowercase ASCII alphanumerics with
/// runs of anything else collapsed to a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "entry".to_string()
    } else {
        slug
    }
}

impl FileStore {
    /// Claim a free filename in `dir` for a new entry by creating it
    /// exclusively. Concurrent creators with the same slug each get a
    /// distinct suffix.
    fn reserve_entry_filename(&self, dir: &Path, entry: &Entry) -> StoreResult<String> {
        let source = if entry.title.trim().is_empty() {
            entry.body.lines().next().unwrap_or("")
        } else {
            entry.title.as_str()
        };
        let stem = slugify(source);
        let ext = &self.config.entry_extension;

        for n in 0..MAX_SUFFIX {
            let candidate = if n == 0 {
                format!("{stem}{ext}")
            } else {
                format!("{stem}-{n}{ext}")
            };
            if fs::reserve_new(&dir.join(&candidate))? {
                return Ok(candidate);
            }
        }

        Err(StoreError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free filename for slug {stem} in {}", dir.display()),
        )))
    }

    fn responses_or_empty<T: ResponseFile>(&self, entry: &EntryRef) -> Vec<T> {
        match self.list_responses::<T>(entry) {
            Ok(items) => items,
            Err(e) => {
                warn!(entry = %entry, kind = %T::KIND, error = %e, "failed to list responses");
                Vec::new()
            }
        }
    }
}

impl Loadable<Entry> for FileStore {
    fn load(&self, key: &EntryRef) -> StoreResult<Entry> {
        let path = paths::entry_file(&self.config, key);
        if !path.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let text = fs::read_text(&path)?;
        let (title, body) = codec::decode_entry(&text);
        let modified = fs::mtime(&path)?;
        let metadata = sidecar::load(&paths::entry_meta_file(&self.config, key))?;
        let created = metadata
            .get(keys::ENTRY_TIMESTAMP)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(millis_to_datetime)
            .unwrap_or(modified);

        let mut entry = Entry {
            category: key.category.clone(),
            filename: Some(key.filename.clone()),
            title,
            body,
            created,
            modified,
            metadata,
            writable: fs::is_writable(&path),
            comments: Vec::new(),
            trackbacks: Vec::new(),
            pingbacks: Vec::new(),
        };

        if self.config.comments_enabled {
            entry.comments = self.responses_or_empty::<Comment>(key);
        }
        if self.config.trackbacks_enabled {
            entry.trackbacks = self.responses_or_empty::<Trackback>(key);
        }
        if self.config.pingbacks_enabled {
            entry.pingbacks = self.responses_or_empty::<Pingback>(key);
        }

        debug!(entry = %key, "entry loaded");
        Ok(entry)
    }
}

impl Savable<Entry> for FileStore {
    fn save(&self, entry: &mut Entry) -> StoreResult<EntryRef> {
        let dir = paths::category_dir(self.home(), &entry.category);
        stdfs::create_dir_all(&dir)?;

        let (filename, reserved) = match &entry.filename {
            Some(existing) => (existing.clone(), false),
            None => (self.reserve_entry_filename(&dir, entry)?, true),
        };
        let key = EntryRef::new(entry.category.clone(), filename.clone())?;
        let content = paths::entry_file(&self.config, &key);

        entry.created = truncate_to_millis(entry.created);
        let created_ms = entry.created.timestamp_millis().to_string();
        entry
            .metadata
            .entry(keys::ENTRY_TIMESTAMP.to_string())
            .or_insert(created_ms);

        let body = codec::encode_entry(&entry.title, &entry.body);
        if let Err(e) = fs::write_atomic(&content, body.as_bytes()) {
            if reserved {
                let _ = fs::remove_if_exists(&content);
            }
            return Err(e.into());
        }

        let meta = paths::entry_meta_file(&self.config, &key);
        sidecar::save(&meta, &entry.metadata)?;
        fs::set_mtime(&meta, entry.created)?;
        fs::set_mtime(&content, entry.created)?;

        entry.filename = Some(filename);
        entry.modified = fs::mtime(&content)?;

        if reserved {
            info!(entry = %key, "entry created");
        } else {
            debug!(entry = %key, "entry updated");
        }
        Ok(key)
    }
}

impl Deletable<Entry> for FileStore {
    fn delete(&self, key: &EntryRef) -> StoreResult<()> {
        let content = paths::entry_file(&self.config, key);
        if !content.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        stdfs::remove_file(&content).map_err(|e| fs::not_found_or_io(e, &content))?;
        fs::remove_if_exists(&paths::entry_meta_file(&self.config, key))?;
        for kind in ResponseKind::ALL {
            fs::remove_dir_if_exists(&paths::responses_dir(&self.config, kind, key))?;
        }

        info!(entry = %key, "entry deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Duration;
    use quire_types::{BlogConfig, CategoryPath};

    use super::*;
    use crate::traits::Fetcher;

    fn temp_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(BlogConfig::new(dir.path())).unwrap();
        (dir, store)
    }

    fn news() -> CategoryPath {
        CategoryPath::parse("news").unwrap()
    }

    // ---------------------------------------------------------------
    // Slugs
    // ---------------------------------------------------------------

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  --Rust 2024--  "), "rust-2024");
        assert_eq!(slugify("???"), "entry");
    }

    #[test]
    fn slug_is_bounded() {
        let long = "a".repeat(500);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);
    }

    // ---------------------------------------------------------------
    // Save / load
    // ---------------------------------------------------------------

    #[test]
    fn first_save_assigns_filename_and_creates_category() {
        let (dir, store) = temp_store();
        let mut entry = Entry::new(news(), "Hello World", "Body text");
        let key = store.save_entry(&mut entry).unwrap();

        assert_eq!(key.filename, "hello-world.txt");
        assert_eq!(entry.filename.as_deref(), Some("hello-world.txt"));
        let on_disk = stdfs::read_to_string(dir.path().join("news/hello-world.txt")).unwrap();
        assert_eq!(on_disk, "Hello World\nBody text");
        assert!(dir.path().join("news/hello-world.txt.meta").is_file());
    }

    #[test]
    fn colliding_slugs_get_numeric_suffix() {
        let (_dir, store) = temp_store();
        let names: Vec<String> = (0..3)
            .map(|_| {
                let mut e = Entry::new(news(), "Same", "x");
                store.save_entry(&mut e).unwrap().filename
            })
            .collect();
        assert_eq!(names, vec!["same.txt", "same-1.txt", "same-2.txt"]);
    }

    #[test]
    fn untitled_entry_slugs_from_body() {
        let (dir, store) = temp_store();
        let mut entry = Entry::new(CategoryPath::root(), "", "First line\nsecond");
        let key = store.save_entry(&mut entry).unwrap();
        assert_eq!(key.filename, "first-line.txt");
        let raw = stdfs::read_to_string(dir.path().join("first-line.txt")).unwrap();
        assert_eq!(raw, "First line\nsecond");
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let (_dir, store) = temp_store();
        let mut entry = Entry::new(news(), "Title", "Line one\nLine two");
        entry.metadata.insert("mood".into(), "sunny".into());
        let key = store.save_entry(&mut entry).unwrap();

        let loaded = store.load_entry(&key).unwrap();
        assert_eq!(loaded.title, "Title");
        assert_eq!(loaded.body, "Line one\nLine two");
        assert_eq!(loaded.metadata["mood"], "sunny");
        assert_eq!(loaded.created, entry.created);
        assert!(loaded.writable);
        assert!(loaded.supports_comments());
    }

    #[test]
    fn resave_keeps_filename_and_creation_time() {
        let (dir, store) = temp_store();
        let mut entry = Entry::new(news(), "Post", "v1");
        entry.created = entry.created - Duration::days(30);
        let key = store.save_entry(&mut entry).unwrap();
        let created = entry.created;

        let mut loaded = store.load_entry(&key).unwrap();
        loaded.body = "v2".into();
        let again = store.save_entry(&mut loaded).unwrap();
        assert_eq!(again, key);

        let reloaded = store.load_entry(&key).unwrap();
        assert_eq!(reloaded.body, "v2");
        assert_eq!(reloaded.created, created);
        let files = stdfs::read_dir(dir.path().join("news")).unwrap().count();
        assert_eq!(files, 2, "content and sidecar only");
    }

    #[test]
    fn resave_restores_content_mtime_to_creation_time() {
        let (dir, store) = temp_store();
        let mut entry = Entry::new(news(), "Post", "v1");
        entry.created = millis_to_datetime(1_000_000_000_000);
        let key = store.save_entry(&mut entry).unwrap();

        let mut loaded = store.load_entry(&key).unwrap();
        loaded.body = "edited".into();
        store.save_entry(&mut loaded).unwrap();

        let content = dir.path().join("news/post.txt");
        assert_eq!(fs::mtime(&content).unwrap(), millis_to_datetime(1_000_000_000_000));
        assert_eq!(loaded.modified, loaded.created);
    }

    #[test]
    fn resave_keeps_read_only_entry_read_only() {
        let (dir, store) = temp_store();
        let mut entry = Entry::new(news(), "Post", "v1");
        let key = store.save_entry(&mut entry).unwrap();
        let content = dir.path().join("news/post.txt");
        let mut perms = stdfs::metadata(&content).unwrap().permissions();
        perms.set_readonly(true);
        stdfs::set_permissions(&content, perms).unwrap();

        let mut loaded = store.load_entry(&key).unwrap();
        assert!(!loaded.writable);
        loaded.body = "v2".into();
        store.save_entry(&mut loaded).unwrap();

        let reloaded = store.load_entry(&key).unwrap();
        assert_eq!(reloaded.body, "v2");
        assert!(!reloaded.writable);
        assert!(!reloaded.supports_comments());
    }

    #[test]
    fn creation_time_survives_touched_file() {
        let (dir, store) = temp_store();
        let mut entry = Entry::new(news(), "Post", "body");
        entry.created = millis_to_datetime(1_000_000_000_000);
        let key = store.save_entry(&mut entry).unwrap();

        fs::set_mtime(&dir.path().join("news/post.txt"), millis_to_datetime(1_600_000_000_000))
            .unwrap();
        let loaded = store.load_entry(&key).unwrap();
        assert_eq!(loaded.created, millis_to_datetime(1_000_000_000_000));
        assert_eq!(loaded.modified, millis_to_datetime(1_600_000_000_000));
    }

    #[test]
    fn missing_sidecar_falls_back_to_mtime() {
        let (dir, store) = temp_store();
        let path = dir.path().join("loose.txt");
        stdfs::write(&path, "Loose\nno metadata").unwrap();
        let when = millis_to_datetime(1_400_000_000_000);
        fs::set_mtime(&path, when).unwrap();

        let key = EntryRef::new(CategoryPath::root(), "loose.txt").unwrap();
        let loaded = store.load_entry(&key).unwrap();
        assert!(loaded.metadata.is_empty());
        assert_eq!(loaded.created, when);
    }

    #[test]
    fn load_missing_is_not_found() {
        let (_dir, store) = temp_store();
        let key = EntryRef::new(news(), "ghost.txt").unwrap();
        assert!(matches!(store.load_entry(&key), Err(StoreError::NotFound(_))));
    }

    // ---------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------

    #[test]
    fn delete_removes_everything_and_is_not_idempotent() {
        let (dir, store) = temp_store();
        let mut entry = Entry::new(news(), "Doomed", "body");
        let key = store.save_entry(&mut entry).unwrap();

        let mut comment = Comment::new(key.clone(), "A", "", "", "hi");
        store.save_comment(&mut comment).unwrap();
        let mut tb = Trackback::new(key.clone(), "t", "e", "http://a", "b");
        store.save_trackback(&mut tb).unwrap();
        let mut pb = Pingback::new(key.clone(), "t", "http://src", "b", "e");
        store.save_pingback(&mut pb).unwrap();

        store.delete_entry(&key).unwrap();

        let base = dir.path().join("news");
        assert!(!base.join("doomed.txt").exists());
        assert!(!base.join("doomed.txt.meta").exists());
        assert!(!base.join(".comments/doomed.txt").exists());
        assert!(!base.join(".trackbacks/doomed.txt").exists());
        assert!(!base.join(".pingbacks/doomed.txt").exists());

        assert!(matches!(store.delete_entry(&key), Err(StoreError::NotFound(_))));
    }

    // ---------------------------------------------------------------
    // Concurrency
    // ---------------------------------------------------------------

    #[test]
    fn concurrent_creates_never_share_a_filename() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut e = Entry::new(news(), "Race", format!("writer {i}"));
                    store.save_entry(&mut e).unwrap().filename
                })
            })
            .collect();

        let mut names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);

        let bodies: Vec<String> = store
            .fetch_entries(&crate::EntryFilter::category(news()))
            .unwrap()
            .into_iter()
            .map(|e| e.body)
            .collect();
        assert_eq!(bodies.len(), 8);
    }

    #[test]
    fn load_populates_enabled_responses_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BlogConfig::new(dir.path());
        config.trackbacks_enabled = false;
        let store = FileStore::open(config).unwrap();

        let mut entry = Entry::new(news(), "Post", "body");
        let key = store.save_entry(&mut entry).unwrap();
        store
            .save_comment(&mut Comment::new(key.clone(), "A", "", "", "one"))
            .unwrap();
        store
            .save_trackback(&mut Trackback::new(key.clone(), "t", "e", "u", "b"))
            .unwrap();

        let loaded = store.load_entry(&key).unwrap();
        assert_eq!(loaded.comments.len(), 1);
        assert!(loaded.trackbacks.is_empty());
    }
}
