use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::metadata::Metadata;
use crate::response::ResponseKind;

/// Property keys recognized in `blog.properties`.
pub mod settings {
    pub const HOME: &str = "blog-home";
    pub const FILE_ENCODING: &str = "blog-file-encoding";
    pub const COMMENTS_ENABLED: &str = "blog-comments-enabled";
    pub const TRACKBACKS_ENABLED: &str = "blog-trackbacks-enabled";
    pub const PINGBACKS_ENABLED: &str = "blog-pingbacks-enabled";
    pub const COMMENTS_DIRECTORY: &str = "blog-comments-directory";
    pub const TRACKBACKS_DIRECTORY: &str = "blog-trackbacks-directory";
    pub const PINGBACKS_DIRECTORY: &str = "blog-pingbacks-directory";
    pub const ENTRY_META_EXTENSION: &str = "blog-entry-meta-data-extension";
    pub const PROPERTIES_EXTENSIONS: &str = "blog-properties-extensions";
    pub const FILE_EXTENSIONS: &str = "blog-file-extensions";
    pub const ENTRY_EXTENSION: &str = "blog-entry-extension";
    pub const COMMENT_THROTTLE: &str = "plugin-comment-throttle";
    pub const COMMENT_DAYS_EXPIRATION: &str = "plugin-comment-days-expiration";
    pub const COMMENT_AUTOFORMAT: &str = "plugin-comment-autoformat";
    pub const BANNED_IPS: &str = "ip-banned-addresses";
}

/// Throttle window used when `plugin-comment-throttle` is set but unparsable.
pub const DEFAULT_THROTTLE_MINUTES: u32 = 5;

const KNOWN_KEYS: &[&str] = &[
    settings::HOME,
    settings::FILE_ENCODING,
    settings::COMMENTS_ENABLED,
    settings::TRACKBACKS_ENABLED,
    settings::PINGBACKS_ENABLED,
    settings::COMMENTS_DIRECTORY,
    settings::TRACKBACKS_DIRECTORY,
    settings::PINGBACKS_DIRECTORY,
    settings::ENTRY_META_EXTENSION,
    settings::PROPERTIES_EXTENSIONS,
    settings::FILE_EXTENSIONS,
    settings::ENTRY_EXTENSION,
    settings::COMMENT_THROTTLE,
    settings::COMMENT_DAYS_EXPIRATION,
    settings::COMMENT_AUTOFORMAT,
    settings::BANNED_IPS,
];

/// Per-blog configuration.
///
/// Loaded once from `blog.properties` and treated as immutable while
/// requests run. Keys this type does not model are kept in `extra` so an
/// administrative rewrite does not lose them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogConfig {
    /// Absolute root directory of all content.
    pub home: PathBuf,
    pub file_encoding: String,
    pub comments_enabled: bool,
    pub trackbacks_enabled: bool,
    pub pingbacks_enabled: bool,
    pub comments_directory: String,
    pub trackbacks_directory: String,
    pub pingbacks_directory: String,
    /// Extension of entry sidecar files, including the dot.
    pub entry_meta_extension: String,
    pub properties_extensions: Vec<String>,
    /// Extensions recognized as entry content when listing.
    pub file_extensions: Vec<String>,
    /// Extension given to newly created entries.
    pub entry_extension: String,
    /// Minutes between accepted comments from one IP. `None` disables throttling.
    pub comment_throttle_minutes: Option<u32>,
    /// Days after which an entry stops accepting comments. `None` means never.
    pub comment_expiration_days: Option<u32>,
    pub comment_autoformat: bool,
    pub banned_ips: Vec<String>,
    #[serde(default)]
    pub extra: Metadata,
}

impl BlogConfig {
    /// Defaults for a blog rooted at `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            file_encoding: "UTF-8".to_string(),
            comments_enabled: true,
            trackbacks_enabled: true,
            pingbacks_enabled: true,
            comments_directory: ".comments".to_string(),
            trackbacks_directory: ".trackbacks".to_string(),
            pingbacks_directory: ".pingbacks".to_string(),
            entry_meta_extension: ".meta".to_string(),
            properties_extensions: vec![".properties".to_string()],
            file_extensions: vec![".txt".to_string(), ".html".to_string()],
            entry_extension: ".txt".to_string(),
            comment_throttle_minutes: None,
            comment_expiration_days: None,
            comment_autoformat: false,
            banned_ips: Vec::new(),
            extra: Metadata::new(),
        }
    }

    /// Build a configuration from parsed `blog.properties` pairs.
    pub fn from_properties(props: &Metadata) -> Result<Self, TypeError> {
        let home = props
            .get(settings::HOME)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TypeError::Config(format!("{} is required", settings::HOME)))?;
        let home = PathBuf::from(home);
        if !home.is_absolute() {
            return Err(TypeError::Config(format!(
                "{} must be absolute: {}",
                settings::HOME,
                home.display()
            )));
        }

        let mut config = Self::new(home);

        if let Some(encoding) = non_blank(props, settings::FILE_ENCODING) {
            let normalized = encoding.to_ascii_uppercase().replace('_', "-");
            if normalized != "UTF-8" && normalized != "UTF8" {
                return Err(TypeError::Config(format!("unsupported encoding: {encoding}")));
            }
            config.file_encoding = "UTF-8".to_string();
        }

        if let Some(v) = non_blank(props, settings::COMMENTS_ENABLED) {
            config.comments_enabled = parse_bool(v);
        }
        if let Some(v) = non_blank(props, settings::TRACKBACKS_ENABLED) {
            config.trackbacks_enabled = parse_bool(v);
        }
        if let Some(v) = non_blank(props, settings::PINGBACKS_ENABLED) {
            config.pingbacks_enabled = parse_bool(v);
        }

        if let Some(v) = non_blank(props, settings::COMMENTS_DIRECTORY) {
            config.comments_directory = directory_name(settings::COMMENTS_DIRECTORY, v)?;
        }
        if let Some(v) = non_blank(props, settings::TRACKBACKS_DIRECTORY) {
            config.trackbacks_directory = directory_name(settings::TRACKBACKS_DIRECTORY, v)?;
        }
        if let Some(v) = non_blank(props, settings::PINGBACKS_DIRECTORY) {
            config.pingbacks_directory = directory_name(settings::PINGBACKS_DIRECTORY, v)?;
        }

        if let Some(v) = non_blank(props, settings::ENTRY_META_EXTENSION) {
            config.entry_meta_extension = v.to_string();
        }
        if let Some(v) = non_blank(props, settings::PROPERTIES_EXTENSIONS) {
            config.properties_extensions = split_list(v);
        }
        if let Some(v) = non_blank(props, settings::FILE_EXTENSIONS) {
            config.file_extensions = split_list(v);
        }
        if let Some(v) = non_blank(props, settings::ENTRY_EXTENSION) {
            config.entry_extension = v.to_string();
        }

        config.comment_throttle_minutes = non_blank(props, settings::COMMENT_THROTTLE)
            .map(|v| v.parse().unwrap_or(DEFAULT_THROTTLE_MINUTES));
        config.comment_expiration_days = non_blank(props, settings::COMMENT_DAYS_EXPIRATION)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|days| *days > 0);
        if let Some(v) = non_blank(props, settings::COMMENT_AUTOFORMAT) {
            config.comment_autoformat = parse_bool(v);
        }
        if let Some(v) = non_blank(props, settings::BANNED_IPS) {
            config.banned_ips = split_list(v);
        }

        config.extra = props
            .iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(config)
    }

    /// Render back to property pairs, including preserved unknown keys.
    pub fn to_properties(&self) -> Metadata {
        let mut props = self.extra.clone();
        let mut put = |key: &str, value: String| {
            props.insert(key.to_string(), value);
        };
        put(settings::HOME, self.home.display().to_string());
        put(settings::FILE_ENCODING, self.file_encoding.clone());
        put(settings::COMMENTS_ENABLED, self.comments_enabled.to_string());
        put(settings::TRACKBACKS_ENABLED, self.trackbacks_enabled.to_string());
        put(settings::PINGBACKS_ENABLED, self.pingbacks_enabled.to_string());
        put(settings::COMMENTS_DIRECTORY, self.comments_directory.clone());
        put(settings::TRACKBACKS_DIRECTORY, self.trackbacks_directory.clone());
        put(settings::PINGBACKS_DIRECTORY, self.pingbacks_directory.clone());
        put(settings::ENTRY_META_EXTENSION, self.entry_meta_extension.clone());
        put(settings::PROPERTIES_EXTENSIONS, self.properties_extensions.join(","));
        put(settings::FILE_EXTENSIONS, self.file_extensions.join(","));
        put(settings::ENTRY_EXTENSION, self.entry_extension.clone());
        if let Some(minutes) = self.comment_throttle_minutes {
            put(settings::COMMENT_THROTTLE, minutes.to_string());
        }
        if let Some(days) = self.comment_expiration_days {
            put(settings::COMMENT_DAYS_EXPIRATION, days.to_string());
        }
        put(settings::COMMENT_AUTOFORMAT, self.comment_autoformat.to_string());
        if !self.banned_ips.is_empty() {
            put(settings::BANNED_IPS, self.banned_ips.join(","));
        }
        props
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Extension of category metadata files (`blojsom<ext>`).
    pub fn properties_extension(&self) -> &str {
        self.properties_extensions
            .first()
            .map(String::as_str)
            .unwrap_or(".properties")
    }

    /// Subdirectory name holding responses of `kind`.
    pub fn response_directory(&self, kind: ResponseKind) -> &str {
        match kind {
            ResponseKind::Comment => &self.comments_directory,
            ResponseKind::Trackback => &self.trackbacks_directory,
            ResponseKind::Pingback => &self.pingbacks_directory,
        }
    }

    pub fn responses_enabled(&self, kind: ResponseKind) -> bool {
        match kind {
            ResponseKind::Comment => self.comments_enabled,
            ResponseKind::Trackback => self.trackbacks_enabled,
            ResponseKind::Pingback => self.pingbacks_enabled,
        }
    }

    /// Whether a directory name is one of the three response directories.
    pub fn is_response_directory(&self, name: &str) -> bool {
        ResponseKind::ALL
            .iter()
            .any(|kind| self.response_directory(*kind) == name)
    }

    /// Whether a filename carries one of the entry content extensions.
    pub fn is_entry_file(&self, filename: &str) -> bool {
        self.file_extensions
            .iter()
            .any(|ext| filename.len() > ext.len() && filename.ends_with(ext.as_str()))
    }

    pub fn is_banned(&self, ip: &str) -> bool {
        self.banned_ips.iter().any(|banned| banned == ip)
    }
}

fn non_blank<'a>(props: &'a Metadata, key: &str) -> Option<&'a str> {
    props.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn directory_name(key: &str, value: &str) -> Result<String, TypeError> {
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(TypeError::Config(format!("{key} must be a plain directory name: {value}")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Metadata {
        let mut props = Metadata::new();
        props.insert(settings::HOME.into(), "/srv/blog".into());
        props
    }

    // ---------------------------------------------------------------
    // Defaults and parsing
    // ---------------------------------------------------------------

    #[test]
    fn defaults_when_only_home_is_set() {
        let config = BlogConfig::from_properties(&base()).unwrap();
        assert_eq!(config, BlogConfig::new("/srv/blog"));
        assert_eq!(config.comments_directory, ".comments");
        assert_eq!(config.properties_extension(), ".properties");
        assert!(config.comment_throttle_minutes.is_none());
    }

    #[test]
    fn home_is_required_and_absolute() {
        assert!(BlogConfig::from_properties(&Metadata::new()).is_err());
        let mut props = Metadata::new();
        props.insert(settings::HOME.into(), "relative/dir".into());
        assert!(matches!(
            BlogConfig::from_properties(&props),
            Err(TypeError::Config(_))
        ));
    }

    #[test]
    fn only_utf8_is_accepted() {
        let mut props = base();
        props.insert(settings::FILE_ENCODING.into(), "utf-8".into());
        assert!(BlogConfig::from_properties(&props).is_ok());
        props.insert(settings::FILE_ENCODING.into(), "ISO-8859-1".into());
        assert!(BlogConfig::from_properties(&props).is_err());
    }

    #[test]
    fn throttle_falls_back_to_default_when_unparsable() {
        let mut props = base();
        props.insert(settings::COMMENT_THROTTLE.into(), "soon".into());
        let config = BlogConfig::from_properties(&props).unwrap();
        assert_eq!(config.comment_throttle_minutes, Some(DEFAULT_THROTTLE_MINUTES));

        props.insert(settings::COMMENT_THROTTLE.into(), "12".into());
        let config = BlogConfig::from_properties(&props).unwrap();
        assert_eq!(config.comment_throttle_minutes, Some(12));

        props.insert(settings::COMMENT_THROTTLE.into(), "  ".into());
        let config = BlogConfig::from_properties(&props).unwrap();
        assert_eq!(config.comment_throttle_minutes, None);
    }

    #[test]
    fn zero_expiration_means_never() {
        let mut props = base();
        props.insert(settings::COMMENT_DAYS_EXPIRATION.into(), "0".into());
        let config = BlogConfig::from_properties(&props).unwrap();
        assert_eq!(config.comment_expiration_days, None);
    }

    #[test]
    fn lists_and_flags() {
        let mut props = base();
        props.insert(settings::BANNED_IPS.into(), "10.0.0.1, 10.0.0.2,".into());
        props.insert(settings::COMMENTS_ENABLED.into(), "FALSE".into());
        props.insert(settings::FILE_EXTENSIONS.into(), ".txt".into());
        let config = BlogConfig::from_properties(&props).unwrap();
        assert!(config.is_banned("10.0.0.2"));
        assert!(!config.is_banned("10.0.0.3"));
        assert!(!config.comments_enabled);
        assert!(config.is_entry_file("a.txt"));
        assert!(!config.is_entry_file("a.html"));
    }

    #[test]
    fn response_directory_must_be_plain() {
        let mut props = base();
        props.insert(settings::COMMENTS_DIRECTORY.into(), "../escape".into());
        assert!(BlogConfig::from_properties(&props).is_err());
    }

    // ---------------------------------------------------------------
    // Round-trip
    // ---------------------------------------------------------------

    #[test]
    fn unknown_keys_survive_rewrite() {
        let mut props = base();
        props.insert("blog-name".into(), "My Blog".into());
        props.insert(settings::COMMENT_THROTTLE.into(), "3".into());
        let config = BlogConfig::from_properties(&props).unwrap();
        assert_eq!(config.extra["blog-name"], "My Blog");

        let rendered = config.to_properties();
        let again = BlogConfig::from_properties(&rendered).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn response_directory_lookup() {
        let config = BlogConfig::new("/b");
        assert_eq!(config.response_directory(ResponseKind::Pingback), ".pingbacks");
        assert!(config.is_response_directory(".trackbacks"));
        assert!(!config.is_response_directory("travel"));
    }
}
