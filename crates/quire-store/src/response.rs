use std::fs as stdfs;
use std::io;

use chrono::{DateTime, Utc};
use quire_types::{
    Comment, EntryRef, Pingback, Response, ResponseId, ResponseKind, Trackback,
};
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::fs;
use crate::paths;
use crate::sidecar;
use crate::store::FileStore;
use crate::traits::{Deletable, Loadable, Savable};

/// Uppercase hex of the first 128 bits of BLAKE3 over `parts`, concatenated.
fn digest_upper(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode_upper(&hasher.finalize().as_bytes()[..16])
}

/// Content-derived filename stem of a comment: identical author and body
/// always map to the same file.
pub fn comment_digest(author: &str, body: &str) -> String {
    digest_upper(&[author.trim(), body.trim()])
}

/// Filename stem of a pingback, derived from its source URL.
pub fn pingback_digest(url: &str) -> String {
    digest_upper(&[url.trim()])
}

/// How one response kind maps onto its file.
pub(crate) trait ResponseFile: Response + Sized {
    const KIND: ResponseKind;

    /// First saves claim the filename exclusively and refuse to overwrite.
    const EXCLUSIVE: bool = false;

    fn encode(&self) -> String;
    fn decode(entry: EntryRef, text: &str) -> Self;
    fn fresh_filename(&self) -> String;
    fn set_identity(&mut self, filename: String, date: DateTime<Utc>);
    fn set_filename(&mut self, filename: String);
}

impl ResponseFile for Comment {
    const KIND: ResponseKind = ResponseKind::Comment;

    fn encode(&self) -> String {
        codec::encode_comment(self)
    }

    fn decode(entry: EntryRef, text: &str) -> Self {
        codec::decode_comment(entry, text)
    }

    fn fresh_filename(&self) -> String {
        format!("{}{}", comment_digest(&self.author, &self.body), Self::KIND.extension())
    }

    fn set_identity(&mut self, filename: String, date: DateTime<Utc>) {
        self.id = Some(filename);
        self.date = date;
    }

    fn set_filename(&mut self, filename: String) {
        self.id = Some(filename);
    }
}

impl ResponseFile for Trackback {
    const KIND: ResponseKind = ResponseKind::Trackback;

    fn encode(&self) -> String {
        codec::encode_trackback(self)
    }

    fn decode(entry: EntryRef, text: &str) -> Self {
        codec::decode_trackback(entry, text)
    }

    fn fresh_filename(&self) -> String {
        format!("{}{}", self.date.timestamp_millis(), Self::KIND.extension())
    }

    fn set_identity(&mut self, filename: String, date: DateTime<Utc>) {
        self.id = Some(filename);
        self.date = date;
    }

    fn set_filename(&mut self, filename: String) {
        self.id = Some(filename);
    }
}

impl ResponseFile for Pingback {
    const KIND: ResponseKind = ResponseKind::Pingback;
    const EXCLUSIVE: bool = true;

    fn encode(&self) -> String {
        codec::encode_pingback(self)
    }

    fn decode(entry: EntryRef, text: &str) -> Self {
        codec::decode_pingback(entry, text)
    }

    fn fresh_filename(&self) -> String {
        format!("{}{}", pingback_digest(&self.url), Self::KIND.extension())
    }

    fn set_identity(&mut self, filename: String, date: DateTime<Utc>) {
        self.id = Some(filename);
        self.date = date;
    }

    fn set_filename(&mut self, filename: String) {
        self.id = Some(filename);
    }
}

impl FileStore {
    fn check_kind<T: ResponseFile>(id: &ResponseId) -> StoreResult<()> {
        if id.kind != T::KIND {
            return Err(StoreError::InvalidId(format!("{id} is not a {}", T::KIND)));
        }
        Ok(())
    }

    pub(crate) fn load_response<T: ResponseFile>(&self, id: &ResponseId) -> StoreResult<T> {
        Self::check_kind::<T>(id)?;
        let path = paths::response_file(&self.config, id);
        let text = fs::read_text(&path).map_err(|e| match e {
            StoreError::NotFound(_) => StoreError::NotFound(id.to_string()),
            other => other,
        })?;

        let mut item = T::decode(id.entry.clone(), &text);
        item.set_identity(id.filename.clone(), fs::mtime(&path)?);
        *item.metadata_mut() = sidecar::load(&paths::response_metadata_path(&path))?;
        Ok(item)
    }

    pub(crate) fn save_response<T: ResponseFile>(&self, item: &mut T) -> StoreResult<ResponseId> {
        let entry = item.entry().clone();
        if !paths::entry_file(&self.config, &entry).is_file() {
            return Err(StoreError::InvalidParent(entry.to_string()));
        }

        let dir = paths::responses_dir(&self.config, T::KIND, &entry);
        stdfs::create_dir_all(&dir)?;

        let (filename, reserved) = match item.filename() {
            Some(existing) => (existing.to_string(), false),
            None => {
                let fresh = item.fresh_filename();
                if T::EXCLUSIVE && !fs::reserve_new(&dir.join(&fresh))? {
                    return Err(StoreError::AlreadyRegistered(fresh));
                }
                (fresh, T::EXCLUSIVE)
            }
        };
        let id = ResponseId::new(entry, filename.clone())?;
        let path = dir.join(&filename);
        let meta = paths::response_metadata_path(&path);

        let written = (|| -> StoreResult<()> {
            fs::write_atomic(&path, item.encode().as_bytes())?;
            sidecar::save(&meta, item.metadata())?;
            fs::set_mtime(&path, item.date())?;
            fs::set_mtime(&meta, item.date())?;
            Ok(())
        })();
        if let Err(e) = written {
            if reserved {
                let _ = fs::remove_if_exists(&path);
                let _ = fs::remove_if_exists(&meta);
            }
            return Err(e);
        }

        item.set_filename(filename);
        debug!(response = %id, "response saved");
        Ok(id)
    }

    pub(crate) fn delete_response<T: ResponseFile>(&self, id: &ResponseId) -> StoreResult<()> {
        Self::check_kind::<T>(id)?;
        let path = paths::response_file(&self.config, id);
        stdfs::remove_file(&path).map_err(|e| match fs::not_found_or_io(e, &path) {
            StoreError::NotFound(_) => StoreError::NotFound(id.to_string()),
            other => other,
        })?;
        fs::remove_if_exists(&paths::response_metadata_path(&path))?;
        info!(response = %id, "response deleted");
        Ok(())
    }

    /// Responses of one kind for `entry`, oldest first. Files that vanish
    /// or fail to decode while listing are logged and skipped.
    pub(crate) fn list_responses<T: ResponseFile>(&self, entry: &EntryRef) -> StoreResult<Vec<T>> {
        let dir = paths::responses_dir(&self.config, T::KIND, entry);
        let listing = match stdfs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut items: Vec<T> = Vec::new();
        for dirent in listing {
            let dirent = match dirent {
                Ok(d) => d,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let name = dirent.file_name().to_string_lossy().into_owned();
            if ResponseKind::from_filename(&name) != Some(T::KIND) {
                continue;
            }
            let id = match ResponseId::new(entry.clone(), name) {
                Ok(id) => id,
                Err(_) => continue,
            };
            match self.load_response::<T>(&id) {
                Ok(item) => items.push(item),
                Err(e) => warn!(response = %id, error = %e, "skipping response that failed to load"),
            }
        }

        items.sort_by(|a, b| {
            a.date()
                .cmp(&b.date())
                .then_with(|| a.filename().cmp(&b.filename()))
        });
        Ok(items)
    }
}

macro_rules! response_store {
    ($ty:ty) => {
        impl Loadable<$ty> for FileStore {
            fn load(&self, key: &ResponseId) -> StoreResult<$ty> {
                self.load_response(key)
            }
        }

        impl Savable<$ty> for FileStore {
            fn save(&self, item: &mut $ty) -> StoreResult<ResponseId> {
                self.save_response(item)
            }
        }

        impl Deletable<$ty> for FileStore {
            fn delete(&self, key: &ResponseId) -> StoreResult<()> {
                self.delete_response::<$ty>(key)
            }
        }
    };
}

response_store!(Comment);
response_store!(Trackback);
response_store!(Pingback);
