//! Metadata sidecar codec.
//!
//! Sidecars are `key=value` property files stored beside a content file.
//! A missing sidecar is an empty map, never an error. Timestamps are the
//! caller's business: the codec does not touch modification times.

use std::path::Path;

use quire_types::{properties, BlogConfig, Metadata};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::fs::{read_text, write_atomic};

pub fn load(path: &Path) -> StoreResult<Metadata> {
    match read_text(path) {
        Ok(text) => Ok(properties::parse(&text)),
        Err(StoreError::NotFound(_)) => Ok(Metadata::new()),
        Err(e) => Err(e),
    }
}

pub fn save(path: &Path, metadata: &Metadata) -> StoreResult<()> {
    write_atomic(path, properties::render(metadata).as_bytes())?;
    debug!(path = %path.display(), keys = metadata.len(), "sidecar written");
    Ok(())
}

/// Load a blog configuration from a `blog.properties` file.
pub fn load_blog_config(path: &Path) -> StoreResult<BlogConfig> {
    let text = read_text(path).map_err(|e| match e {
        StoreError::NotFound(p) => StoreError::Config(format!("missing blog properties: {p}")),
        other => other,
    })?;
    Ok(BlogConfig::from_properties(&properties::parse(&text))?)
}

/// Rewrite a `blog.properties` file. Unknown keys held in the config survive.
pub fn save_blog_config(path: &Path, config: &BlogConfig) -> StoreResult<()> {
    save(path, &config.to_properties())
}
