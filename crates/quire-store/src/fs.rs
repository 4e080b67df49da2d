use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use filetime::FileTime;
use quire_types::truncate_to_millis;
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};

/// Write `bytes` to `path` through a temporary file in the same directory,
/// then rename it into place. Parent directories are created as needed.
///
/// The replacement carries the permissions of the file it replaces, so a
/// read-only file stays read-only. A new file gets the mode a plain create
/// would give it under the current umask.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let (permissions, placeholder) = target_permissions(path)?;
    let result = replace_with(parent, path, bytes, permissions);
    if result.is_err() && placeholder {
        let _ = fs::remove_file(path);
    }
    result
}

fn replace_with(parent: &Path, path: &Path, bytes: &[u8], permissions: fs::Permissions) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Permissions `path` has now. An absent file is created empty to learn
/// the default mode; the flag reports that placeholder.
fn target_permissions(path: &Path) -> io::Result<(fs::Permissions, bool)> {
    match fs::metadata(path) {
        Ok(meta) => Ok((meta.permissions(), false)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            OpenOptions::new().write(true).create(true).open(path)?;
            Ok((fs::metadata(path)?.permissions(), true))
        }
        Err(e) => Err(e),
    }
}

/// Atomically claim `path` by creating it empty. Returns `false` if the
/// file already exists.
pub fn reserve_new(path: &Path) -> io::Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn read_text(path: &Path) -> StoreResult<String> {
    let bytes = fs::read(path).map_err(|e| not_found_or_io(e, path))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: format!("not valid UTF-8: {e}"),
    })
}

/// Modification time, truncated to milliseconds.
pub fn mtime(path: &Path) -> io::Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(truncate_to_millis(DateTime::<Utc>::from(modified)))
}

pub fn set_mtime(path: &Path, time: DateTime<Utc>) -> io::Result<()> {
    let ft = FileTime::from_unix_time(time.timestamp(), time.timestamp_subsec_nanos());
    filetime::set_file_mtime(path, ft)
}

pub fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

/// Remove a file, treating absence as success. Returns whether it existed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

pub(crate) fn not_found_or_io(err: io::Error, path: &Path) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(path.display().to_string())
    } else {
        StoreError::Io(err)
    }
}
