//! Feed kinds and search queries
//!
//! Profile and hashtag feeds share one pipeline. Everything that differs between them
//! (endpoint, query parameter, attribution, whether the tag filter applies, export
//! naming) is answered by [`FeedKind`].

use crate::error::{Error, Result};
use crate::types::RawItem;
use serde::{Deserialize, Serialize};

/// Attribution used for hashtag items that carry no owner
const UNKNOWN_OWNER: &str = "user";

/// Which backend feed a session browses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Posts of a single profile
    Profile,
    /// Posts tagged with one or more hashtags
    Hashtag,
}

impl FeedKind {
    /// Page endpoint path, relative to the backend base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            FeedKind::Profile => "api/scrape",
            FeedKind::Hashtag => "api/hashtag",
        }
    }

    /// Name of the query parameter carrying the query identifier
    pub fn query_param(&self) -> &'static str {
        match self {
            FeedKind::Profile => "username",
            FeedKind::Hashtag => "tags",
        }
    }

    /// Whether the caption tag filter applies to this feed
    pub fn supports_tag_filter(&self) -> bool {
        matches!(self, FeedKind::Hashtag)
    }

    pub(crate) fn dump_suffix(&self) -> &'static str {
        match self {
            FeedKind::Profile => "profile_dump.json",
            FeedKind::Hashtag => "hashtag_dump.json",
        }
    }
}

/// A validated search submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedQuery {
    /// Profile feed for a username
    Profile {
        /// Username, trimmed
        username: String,
    },
    /// Hashtag feed; the first tag is the primary one
    Hashtag {
        /// Tags without leading `#`, in input order
        tags: Vec<String>,
    },
}

impl FeedQuery {
    /// Build a profile query from user input
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if the username is blank.
    pub fn profile(username: &str) -> Result<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidQuery("username is required".into()));
        }
        Ok(FeedQuery::Profile {
            username: username.to_string(),
        })
    }

    /// Build a hashtag query from comma-separated user input
    ///
    /// Tags are trimmed, one leading `#` is dropped, and empty entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if no tag remains.
    pub fn hashtags(raw: &str) -> Result<Self> {
        let tags: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .map(|t| t.strip_prefix('#').unwrap_or(t).trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if tags.is_empty() {
            return Err(Error::InvalidQuery("at least one hashtag is required".into()));
        }
        Ok(FeedQuery::Hashtag { tags })
    }

    /// Feed kind of this query
    pub fn kind(&self) -> FeedKind {
        match self {
            FeedQuery::Profile { .. } => FeedKind::Profile,
            FeedQuery::Hashtag { .. } => FeedKind::Hashtag,
        }
    }

    /// Value sent in the kind's query parameter (username, or comma-joined tags)
    pub fn identifier(&self) -> String {
        match self {
            FeedQuery::Profile { username } => username.clone(),
            FeedQuery::Hashtag { tags } => tags.join(","),
        }
    }

    /// Primary hashtag, for hashtag queries
    pub fn primary_tag(&self) -> Option<&str> {
        match self {
            FeedQuery::Profile { .. } => None,
            FeedQuery::Hashtag { tags } => tags.first().map(String::as_str),
        }
    }

    /// Attribution for a raw item of this feed
    pub fn attribution(&self, item: &RawItem) -> String {
        match self {
            FeedQuery::Profile { username } => username.clone(),
            FeedQuery::Hashtag { .. } => item
                .owner_username
                .as_deref()
                .filter(|owner| !owner.is_empty())
                .unwrap_or(UNKNOWN_OWNER)
                .to_string(),
        }
    }

    /// Filesystem-friendly stem for export artifacts
    pub fn export_stem(&self) -> String {
        match self {
            FeedQuery::Profile { username } => slugify(username),
            FeedQuery::Hashtag { tags } => slugify(&tags.join(",")),
        }
    }

    /// Suggested file name for the media archive
    pub fn archive_file_name(&self) -> String {
        format!("{}_media.zip", self.export_stem())
    }

    /// Suggested file name for the metadata dump
    pub fn metadata_file_name(&self) -> String {
        format!("{}_{}", self.export_stem(), self.kind().dump_suffix())
    }
}

impl std::fmt::Display for FeedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedQuery::Profile { username } => write!(f, "@{}", username),
            FeedQuery::Hashtag { tags } => {
                let joined: Vec<String> = tags.iter().map(|t| format!("#{}", t)).collect();
                write!(f, "{}", joined.join(" "))
            }
        }
    }
}

/// Collapse runs of non-alphanumerics to `_`, trim underscores, lowercase
///
/// Returns `"export"` when nothing usable remains.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_sep = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if slug.is_empty() {
        "export".to_string()
    } else {
        slug
    }
}
