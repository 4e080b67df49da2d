use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::CategoryPath;
use crate::entry::{validate_filename, EntryRef};
use crate::error::TypeError;
use crate::metadata::{keys, truncate_to_millis, Metadata};

/// Moderation state of a response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    #[default]
    New,
    Approved,
    Spam,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Approved => "approved",
            Self::Spam => "spam",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "approved" => Ok(Self::Approved),
            "spam" => Ok(Self::Spam),
            _ => Err(TypeError::InvalidStatus(s.to_string())),
        }
    }
}

/// The three kinds of response an entry can receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Comment,
    Trackback,
    Pingback,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 3] = [Self::Comment, Self::Trackback, Self::Pingback];

    /// Filename extension of the content file, including the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Comment => ".cmt",
            Self::Trackback => ".trackback",
            Self::Pingback => ".pingback",
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| {
                let ext = kind.extension();
                filename.len() > ext.len() && filename.ends_with(ext)
            })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Trackback => "trackback",
            Self::Pingback => "pingback",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Textual identity of a stored response.
///
/// Rendered as `<category><entry-file>/<response-file>`, for example
/// `news/hello.txt/3F2A...9C.cmt`. The kind is implied by the extension.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResponseId {
    pub kind: ResponseKind,
    pub entry: EntryRef,
    pub filename: String,
}

impl ResponseId {
    pub fn new(entry: EntryRef, filename: impl Into<String>) -> Result<Self, TypeError> {
        let filename = filename.into();
        validate_filename(&filename).map_err(|_| TypeError::InvalidResponseId(filename.clone()))?;
        let kind = ResponseKind::from_filename(&filename)
            .ok_or_else(|| TypeError::InvalidResponseId(filename.clone()))?;
        Ok(Self {
            kind,
            entry,
            filename,
        })
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}",
            self.entry.category.as_str(),
            self.entry.filename,
            self.filename
        )
    }
}

impl FromStr for ResponseId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidResponseId(s.to_string());
        let (rest, filename) = s.trim().rsplit_once('/').ok_or_else(invalid)?;
        let (category, entry_file) = rest.rsplit_once('/').unwrap_or(("", rest));
        let category = CategoryPath::parse(category).map_err(|_| invalid())?;
        let entry = EntryRef::new(category, entry_file).map_err(|_| invalid())?;
        Self::new(entry, filename).map_err(|_| invalid())
    }
}

/// Behaviour shared by comments, trackbacks and pingbacks.
pub trait Response {
    fn kind(&self) -> ResponseKind;
    fn entry(&self) -> &EntryRef;
    /// Content filename, `None` until first saved.
    fn filename(&self) -> Option<&str>;
    fn date(&self) -> DateTime<Utc>;
    fn metadata(&self) -> &Metadata;
    fn metadata_mut(&mut self) -> &mut Metadata;

    fn response_id(&self) -> Option<ResponseId> {
        self.filename().map(|filename| ResponseId {
            kind: self.kind(),
            entry: self.entry().clone(),
            filename: filename.to_string(),
        })
    }

    /// Status from metadata. Missing or unrecognized values read as `New`.
    fn status(&self) -> ResponseStatus {
        self.metadata()
            .get(keys::RESPONSE_STATUS)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    fn set_status(&mut self, status: ResponseStatus) {
        self.metadata_mut()
            .insert(keys::RESPONSE_STATUS.to_string(), status.as_str().to_string());
    }
}

/// A reader comment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub entry: EntryRef,
    pub id: Option<String>,
    pub author: String,
    pub author_email: String,
    pub author_url: String,
    pub body: String,
    pub date: DateTime<Utc>,
    pub metadata: Metadata,
}

impl Comment {
    pub fn new(
        entry: EntryRef,
        author: impl Into<String>,
        author_email: impl Into<String>,
        author_url: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            entry,
            id: None,
            author: author.into(),
            author_email: author_email.into(),
            author_url: author_url.into(),
            body: body.into(),
            date: truncate_to_millis(Utc::now()),
            metadata: Metadata::new(),
        }
    }

    pub fn ip(&self) -> Option<&str> {
        self.metadata.get(keys::RESPONSE_IP).map(String::as_str)
    }
}

/// A trackback ping received from another blog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trackback {
    pub entry: EntryRef,
    pub id: Option<String>,
    pub title: String,
    pub excerpt: String,
    pub url: String,
    pub blog_name: String,
    pub date: DateTime<Utc>,
    pub metadata: Metadata,
}

impl Trackback {
    pub fn new(
        entry: EntryRef,
        title: impl Into<String>,
        excerpt: impl Into<String>,
        url: impl Into<String>,
        blog_name: impl Into<String>,
    ) -> Self {
        Self {
            entry,
            id: None,
            title: title.into(),
            excerpt: excerpt.into(),
            url: url.into(),
            blog_name: blog_name.into(),
            date: truncate_to_millis(Utc::now()),
            metadata: Metadata::new(),
        }
    }
}

/// A pingback received from another site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pingback {
    pub entry: EntryRef,
    pub id: Option<String>,
    pub title: String,
    pub url: String,
    pub blog_name: String,
    pub excerpt: String,
    pub date: DateTime<Utc>,
    pub metadata: Metadata,
}

impl Pingback {
    pub fn new(
        entry: EntryRef,
        title: impl Into<String>,
        url: impl Into<String>,
        blog_name: impl Into<String>,
        excerpt: impl Into<String>,
    ) -> Self {
        Self {
            entry,
            id: None,
            title: title.into(),
            url: url.into(),
            blog_name: blog_name.into(),
            excerpt: excerpt.into(),
            date: truncate_to_millis(Utc::now()),
            metadata: Metadata::new(),
        }
    }
}

macro_rules! impl_response {
    ($ty:ty, $kind:expr) => {
        impl Response for $ty {
            fn kind(&self) -> ResponseKind {
                $kind
            }
            fn entry(&self) -> &EntryRef {
                &self.entry
            }
            fn filename(&self) -> Option<&str> {
                self.id.as_deref()
            }
            fn date(&self) -> DateTime<Utc> {
                self.date
            }
            fn metadata(&self) -> &Metadata {
                &self.metadata
            }
            fn metadata_mut(&mut self) -> &mut Metadata {
                &mut self.metadata
            }
        }
    };
}

impl_response!(Comment, ResponseKind::Comment);
impl_response!(Trackback, ResponseKind::Trackback);
impl_response!(Pingback, ResponseKind::Pingback);
