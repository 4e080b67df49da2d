use serde::{Deserialize, Serialize};

use quire_types::Metadata;

/// Blog property listing the balanced tags the sanitizer lets through.
pub const ALLOWED_BALANCED_TAGS: &str = "plugin-xss-filter-allowed-balanced-tags";
/// Blog property listing the self-closing tags the sanitizer lets through.
pub const ALLOWED_UNBALANCED_TAGS: &str = "plugin-xss-filter-allowed-unbalanced-tags";
/// Blog property toggling `<a href=...>` links in comments.
pub const ALLOW_LINKS: &str = "plugin-xss-filter-allow-links";

const DEFAULT_BALANCED: [&str; 7] = ["b", "i", "blockquote", "pre", "ul", "li", "ol"];
const DEFAULT_UNBALANCED: [&str; 1] = ["br"];

/// Tunables of the comment pipeline that are not core blog settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Tags restored as `<tag>` / `</tag>` pairs.
    pub allowed_balanced_tags: Vec<String>,
    /// Tags restored as `<tag />`.
    pub allowed_unbalanced_tags: Vec<String>,
    pub allow_links: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            allowed_balanced_tags: DEFAULT_BALANCED.iter().map(|t| t.to_string()).collect(),
            allowed_unbalanced_tags: DEFAULT_UNBALANCED.iter().map(|t| t.to_string()).collect(),
            allow_links: true,
        }
    }
}

impl GateConfig {
    /// Read overrides from blog properties, falling back to the defaults
    /// for anything absent or blank.
    pub fn from_properties(props: &Metadata) -> Self {
        let mut config = Self::default();
        if let Some(tags) = tag_list(props, ALLOWED_BALANCED_TAGS) {
            config.allowed_balanced_tags = tags;
        }
        if let Some(tags) = tag_list(props, ALLOWED_UNBALANCED_TAGS) {
            config.allowed_unbalanced_tags = tags;
        }
        if let Some(v) = props.get(ALLOW_LINKS).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            config.allow_links = v.eq_ignore_ascii_case("true");
        }
        config
    }
}

fn tag_list(props: &Metadata, key: &str) -> Option<Vec<String>> {
    let raw = props.get(key)?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
    )
}
