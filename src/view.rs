//! Filtered and sorted views over the media store
//!
//! [`project`] is recomputed from scratch on every call and never mutates its input.
//! Stages run in a fixed order: kind, tags, like floor, then a stable sort.

use crate::error::Error;
use crate::types::{MediaKind, MediaRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which media kinds to show
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    /// Images and videos
    #[default]
    All,
    /// Images only
    Image,
    /// Videos only
    Video,
}

impl KindFilter {
    fn matches(&self, kind: MediaKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Image => kind == MediaKind::Image,
            KindFilter::Video => kind == MediaKind::Video,
        }
    }
}

impl std::str::FromStr for KindFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(KindFilter::All),
            "image" => Ok(KindFilter::Image),
            "video" => Ok(KindFilter::Video),
            other => Err(Error::InvalidFilter(format!("unknown kind filter: {}", other))),
        }
    }
}

/// Ordering of the projected view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recent capture first
    #[default]
    Newest,
    /// Oldest capture first
    Oldest,
    /// Most liked first
    LikesDesc,
    /// Least liked first
    LikesAsc,
}

impl std::str::FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "likes_desc" => Ok(SortOrder::LikesDesc),
            "likes_asc" => Ok(SortOrder::LikesAsc),
            other => Err(Error::InvalidFilter(format!("unknown sort order: {}", other))),
        }
    }
}

/// Quick filter presets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Everything
    All,
    /// Image posts
    Posts,
    /// Video reels
    Reels,
}

/// User-controlled filter and sort settings
///
/// Owned by the UI layer and outlives sessions unless reset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Kind filter
    #[serde(default)]
    pub kind_filter: KindFilter,
    /// Minimum like count
    #[serde(default)]
    pub min_likes: u64,
    /// Lowercased tags; a record matches if it carries any of them
    #[serde(default)]
    pub tag_include: BTreeSet<String>,
    /// Sort order
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl FilterSpec {
    /// Parse comma-separated tag input into a normalized tag set
    ///
    /// Entries are trimmed, one leading `#` is dropped, and everything is lowercased.
    pub fn parse_tag_filter(raw: &str) -> BTreeSet<String> {
        raw.split(',')
            .map(str::trim)
            .map(|t| t.strip_prefix('#').unwrap_or(t).trim())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    /// Replace the tag filter from raw user input
    pub fn set_tag_filter(&mut self, raw: &str) {
        self.tag_include = Self::parse_tag_filter(raw);
    }

    /// Apply a quick preset to the kind filter
    pub fn apply_preset(&mut self, preset: Preset) {
        self.kind_filter = match preset {
            Preset::All => KindFilter::All,
            Preset::Posts => KindFilter::Image,
            Preset::Reels => KindFilter::Video,
        };
    }

    /// Copy of this spec with the tag filter cleared
    pub fn without_tags(&self) -> Self {
        Self {
            tag_include: BTreeSet::new(),
            ..self.clone()
        }
    }
}

/// Derive the filtered, sorted view of `records`
pub fn project(records: &[MediaRecord], spec: &FilterSpec) -> Vec<MediaRecord> {
    let wanted_tags: BTreeSet<String> = spec
        .tag_include
        .iter()
        .map(|t| t.to_lowercase())
        .collect();

    let mut view: Vec<MediaRecord> = records
        .iter()
        .filter(|r| spec.kind_filter.matches(r.kind))
        .filter(|r| {
            wanted_tags.is_empty()
                || r.tags
                    .iter()
                    .any(|tag| wanted_tags.contains(&tag.to_lowercase()))
        })
        .filter(|r| r.like_count >= spec.min_likes)
        .cloned()
        .collect();

    // sort_by is stable: ties keep store order
    match spec.sort_order {
        SortOrder::LikesDesc => view.sort_by(|a, b| b.like_count.cmp(&a.like_count)),
        SortOrder::LikesAsc => view.sort_by(|a, b| a.like_count.cmp(&b.like_count)),
        SortOrder::Newest => view.sort_by(|a, b| b.sort_instant().cmp(&a.sort_instant())),
        SortOrder::Oldest => view.sort_by(|a, b| a.sort_instant().cmp(&b.sort_instant())),
    }

    view
}
