//! Core types for feedscope

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Locally assigned identifier of a [`MediaRecord`]
///
/// Assigned by the [`MediaStore`](crate::store::MediaStore) at append time; restarts at
/// 0 for every session. Never derived from backend data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub u64);

impl MediaId {
    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token identifying one search session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub u64);

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    #[default]
    Image,
    /// Video clip
    Video,
}

impl MediaKind {
    /// File extension used for archive entries
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }
}

/// One item of a page as returned by the backend
///
/// Every field is optional on the wire; normalization fills in defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// `image` or `video`
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    /// Thumbnail / display URL
    #[serde(default)]
    pub thumb_url: String,
    /// Playable URL (videos only)
    #[serde(default)]
    pub video_url: Option<String>,
    /// Like count
    #[serde(default)]
    pub likes: Option<u64>,
    /// Caption text
    #[serde(default)]
    pub caption: Option<String>,
    /// ISO-8601 capture time
    #[serde(default)]
    pub taken_at: Option<String>,
    /// Comment count
    #[serde(default)]
    pub comments_count: Option<u64>,
    /// Post shortcode used for permalinks
    #[serde(default)]
    pub shortcode: Option<String>,
    /// Caption hashtags
    #[serde(default)]
    pub hashtags: Option<Vec<String>>,
    /// Post owner (hashtag feeds only)
    #[serde(default)]
    pub owner_username: Option<String>,
}

/// Profile header returned with profile pages
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Username
    pub username: String,
    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Biography text
    #[serde(default)]
    pub biography: Option<String>,
    /// Upstream profile picture URL
    #[serde(default)]
    pub profile_pic: Option<String>,
    /// Follower count
    #[serde(default)]
    pub followers: u64,
    /// Following count
    #[serde(default)]
    pub following: u64,
    /// Total posts on the profile
    #[serde(default)]
    pub posts_count: u64,
    /// Verified badge
    #[serde(default)]
    pub is_verified: bool,
    /// Private profile
    #[serde(default)]
    pub is_private: bool,
}

/// One page from the backend page endpoint
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Items on this page, in backend order
    #[serde(default)]
    pub media: Vec<RawItem>,
    /// Cursor for the next page
    pub offset: u64,
    /// Whether another page exists
    #[serde(default)]
    pub has_more: bool,
    /// Profile header (profile feeds only)
    #[serde(default)]
    pub profile: Option<ProfileRecord>,
}

/// Canonical, immutable media record held by the store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Session-local identifier
    pub id: MediaId,
    /// Attribution (profile username, or per-item owner for hashtag feeds)
    #[serde(rename = "username")]
    pub owner_handle: String,
    /// Image or video
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Thumbnail URL
    #[serde(rename = "thumb_url")]
    pub thumbnail_url: String,
    /// Playable URL (videos only)
    #[serde(rename = "video_url")]
    pub playable_url: Option<String>,
    /// Like count
    #[serde(rename = "likes")]
    pub like_count: u64,
    /// Comment count
    #[serde(rename = "comments_count")]
    pub comment_count: u64,
    /// Caption, possibly empty
    pub caption: String,
    /// Capture time, if the backend supplied a parseable one
    #[serde(rename = "taken_at")]
    pub captured_at: Option<DateTime<Utc>>,
    /// Post reference for permalinks
    #[serde(rename = "shortcode")]
    pub post_reference: Option<String>,
    /// Caption hashtags
    #[serde(rename = "hashtags")]
    pub tags: Vec<String>,
}

impl MediaRecord {
    /// URL of the payload an export should download
    pub fn download_url(&self) -> &str {
        self.playable_url.as_deref().unwrap_or(&self.thumbnail_url)
    }

    /// Deterministic archive entry name: `{owner}_{id}.{ext}`
    pub fn file_name(&self) -> String {
        format!("{}_{}.{}", self.owner_handle, self.id, self.kind.extension())
    }

    /// External permalink to the original post
    pub fn permalink(&self) -> Option<String> {
        self.post_reference
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|code| format!("https://www.instagram.com/p/{}/", code))
    }

    /// Capture time as used for date ordering; absent sorts as the Unix epoch
    pub fn sort_instant(&self) -> DateTime<Utc> {
        self.captured_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Parse a backend capture timestamp
///
/// Accepts RFC 3339, naive ISO-8601 date-times (read as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Backend reachability as reported by the health probe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendHealth {
    /// Health endpoint answered with a success status
    Online,
    /// Health endpoint unreachable or unhealthy; browsing may still work
    Offline,
}

/// Progress of a running archive export
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProgress {
    /// Items processed so far, successful or skipped
    pub done: usize,
    /// Items in the export snapshot
    pub total: usize,
}

/// Events emitted by the feed pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A new search replaced the previous session
    SessionStarted {
        /// New session token
        session: SessionToken,
        /// Query label (username or joined tags)
        query: String,
    },

    /// A page was appended to the session store
    PageAppended {
        /// Session the page belongs to
        session: SessionToken,
        /// Items added by this page
        added: usize,
        /// Items in the store after the append
        total: usize,
        /// Backend cursor for the next page
        cursor: u64,
    },

    /// A page fetch failed
    PageFailed {
        /// Session the fetch belonged to
        session: SessionToken,
        /// Error message
        error: String,
    },

    /// A page arrived for a session that has since been replaced
    StalePageDiscarded {
        /// Session the page was requested for
        session: SessionToken,
    },

    /// The backend reported no further pages
    FeedExhausted {
        /// Session that was exhausted
        session: SessionToken,
        /// Final item count
        total: usize,
    },

    /// An archive export processed another item
    ExportProgress {
        /// Items processed so far
        done: usize,
        /// Items in the export
        total: usize,
    },

    /// An archive export skipped an item
    ExportItemSkipped {
        /// Record identifier
        id: MediaId,
        /// Entry name the item would have used
        file_name: String,
        /// Error message
        error: String,
    },

    /// An archive export finished
    ExportComplete {
        /// Files written to the archive
        files: usize,
        /// Items skipped
        skipped: usize,
    },
}
