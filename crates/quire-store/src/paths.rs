//! Pure mapping from logical coordinates to filesystem paths.
//!
//! Nothing in this module performs I/O. Every category is a
//! [`CategoryPath`], which is already normalized, so composition never
//! produces doubled or missing separators.

use std::path::{Path, PathBuf};

use quire_types::{BlogConfig, CategoryPath, EntryRef, ResponseId, ResponseKind};

/// Sidecar extension for response files. Fixed regardless of blog settings.
pub const RESPONSE_META_EXTENSION: &str = ".meta";

/// Base name of the per-category metadata file.
pub const CATEGORY_META_BASENAME: &str = "blojsom";

/// `<home>/<category>`
pub fn category_dir(home: &Path, category: &CategoryPath) -> PathBuf {
    if category.is_root() {
        home.to_path_buf()
    } else {
        home.join(category.as_str().trim_end_matches('/'))
    }
}

/// `<home>/<category>/<filename>`
pub fn entry_path(home: &Path, category: &CategoryPath, filename: &str) -> PathBuf {
    category_dir(home, category).join(filename)
}

/// `<home>/<category>/<subdir>/<entry-filename>`
pub fn response_dir(
    home: &Path,
    category: &CategoryPath,
    subdir: &str,
    entry_filename: &str,
) -> PathBuf {
    category_dir(home, category).join(subdir).join(entry_filename)
}

/// Sidecar path beside `content`: the full filename with `extension` appended.
pub fn metadata_path(content: &Path, extension: &str) -> PathBuf {
    let mut name = content
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(extension);
    content.with_file_name(name)
}

pub fn response_metadata_path(content: &Path) -> PathBuf {
    metadata_path(content, RESPONSE_META_EXTENSION)
}

/// `<home>/<category>/blojsom<ext>`
pub fn category_metadata_path(home: &Path, category: &CategoryPath, extension: &str) -> PathBuf {
    category_dir(home, category).join(format!("{CATEGORY_META_BASENAME}{extension}"))
}

// ---------------------------------------------------------------------------
// Config-aware helpers
// ---------------------------------------------------------------------------

pub fn entry_file(config: &BlogConfig, entry: &EntryRef) -> PathBuf {
    entry_path(config.home(), &entry.category, &entry.filename)
}

pub fn entry_meta_file(config: &BlogConfig, entry: &EntryRef) -> PathBuf {
    metadata_path(&entry_file(config, entry), &config.entry_meta_extension)
}

pub fn responses_dir(config: &BlogConfig, kind: ResponseKind, entry: &EntryRef) -> PathBuf {
    response_dir(
        config.home(),
        &entry.category,
        config.response_directory(kind),
        &entry.filename,
    )
}

pub fn response_file(config: &BlogConfig, id: &ResponseId) -> PathBuf {
    responses_dir(config, id.kind, &id.entry).join(&id.filename)
}

pub fn category_meta_file(config: &BlogConfig, category: &CategoryPath) -> PathBuf {
    category_metadata_path(config.home(), category, config.properties_extension())
}
