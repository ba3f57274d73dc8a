//! Append-only media store for one search session
//!
//! The store owns identity: every appended item gets the next [`MediaId`], starting at
//! 0. Items are kept in arrival order across appends, which is the secondary order the
//! view relies on for stable sorting.

use crate::feed::FeedQuery;
use crate::types::{MediaId, MediaRecord, RawItem, parse_timestamp};
use tracing::debug;

/// Ordered collection of the current session's media records
#[derive(Clone, Debug, Default)]
pub struct MediaStore {
    records: Vec<MediaRecord>,
    next_id: u64,
}

impl MediaStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and append a page of raw items in arrival order
    ///
    /// Returns the number of records added.
    pub fn append(&mut self, query: &FeedQuery, items: Vec<RawItem>) -> usize {
        let added = items.len();
        self.records.reserve(added);

        for item in items {
            let id = MediaId(self.next_id);
            self.next_id += 1;
            self.records.push(normalize(id, query, item));
        }

        debug!(added, total = self.records.len(), "appended page to media store");
        added
    }

    /// Drop every record and restart identifiers at 0
    pub fn reset(&mut self) {
        self.records.clear();
        self.next_id = 0;
    }

    /// Owned copy of the records in append order
    pub fn snapshot(&self) -> Vec<MediaRecord> {
        self.records.clone()
    }

    /// Borrow the records in append order
    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Map a raw backend item into a canonical record
pub fn normalize(id: MediaId, query: &FeedQuery, item: RawItem) -> MediaRecord {
    let owner_handle = query.attribution(&item);

    let captured_at = item.taken_at.as_deref().and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            debug!(%id, taken_at = raw, "unparseable capture time, treating as absent");
        }
        parsed
    });

    MediaRecord {
        id,
        owner_handle,
        kind: item.kind,
        thumbnail_url: item.thumb_url,
        playable_url: item.video_url.filter(|url| !url.is_empty()),
        like_count: item.likes.unwrap_or(0),
        comment_count: item.comments_count.unwrap_or(0),
        caption: item.caption.unwrap_or_default(),
        captured_at,
        post_reference: item.shortcode,
        tags: item.hashtags.unwrap_or_default(),
    }
}
