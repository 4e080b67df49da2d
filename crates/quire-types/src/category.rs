use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::metadata::Metadata;

/// Normalized category path relative to blog home.
///
/// The root category is the empty string; every other category has no
/// leading slash and exactly one trailing slash (`"travel/europe/"`). All
/// path composition goes through this type, so double or missing slashes
/// cannot reach the filesystem.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryPath(String);

impl CategoryPath {
    /// The root category (blog home itself).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Normalize a raw category string.
    ///
    /// Accepts `/`, `\`, or no separators at either end, collapses repeated
    /// separators and `.` segments. Rejects `..` and dot-prefixed segments,
    /// which would escape blog home or alias a response directory.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let unified = raw.trim().replace('\\', "/");
        let mut normalized = String::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                s if s.starts_with('.') => {
                    return Err(TypeError::InvalidCategory(raw.to_string()));
                }
                s => {
                    normalized.push_str(s);
                    normalized.push('/');
                }
            }
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a child segment (or nested path).
    pub fn join(&self, child: &str) -> Result<Self, TypeError> {
        Self::parse(&format!("{}{}", self.0, child))
    }

    /// Parent category, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let trimmed = &self.0[..self.0.len() - 1];
        match trimmed.rfind('/') {
            Some(idx) => Some(Self(trimmed[..=idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Last path segment, empty for the root.
    pub fn name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or("")
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl TryFrom<String> for CategoryPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CategoryPath> for String {
    fn from(value: CategoryPath) -> Self {
        value.0
    }
}

/// A category directory and its metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub path: CategoryPath,
    pub metadata: Metadata,
}

impl Category {
    pub fn new(path: CategoryPath) -> Self {
        Self {
            path,
            metadata: Metadata::new(),
        }
    }

    /// Human-readable name from the `blog-category-name` metadata key,
    /// falling back to the directory name.
    pub fn display_name(&self) -> &str {
        self.metadata
            .get(crate::keys::CATEGORY_NAME)
            .map(String::as_str)
            .unwrap_or_else(|| self.path.name())
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata
            .get(crate::keys::CATEGORY_DESCRIPTION)
            .map(String::as_str)
    }
}
