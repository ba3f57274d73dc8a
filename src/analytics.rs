//! Summary statistics over a session's records

use crate::types::MediaRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many records [`FeedAnalytics::top_liked`] keeps
const TOP_LIKED: usize = 3;

/// Aggregate numbers shown next to a feed
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedAnalytics {
    /// Records loaded so far
    pub total: usize,
    /// Earliest capture time among dated records
    pub first_captured: Option<DateTime<Utc>>,
    /// Latest capture time among dated records
    pub last_captured: Option<DateTime<Utc>>,
    /// Records per day over the captured range (at least one day), 0 without dates
    pub average_per_day: f64,
    /// Most liked records, ties in store order
    pub top_liked: Vec<MediaRecord>,
}

impl FeedAnalytics {
    /// Compute analytics for records in store order
    pub fn compute(records: &[MediaRecord]) -> Self {
        let total = records.len();
        if total == 0 {
            return Self::default();
        }

        let first_captured = records.iter().filter_map(|r| r.captured_at).min();
        let last_captured = records.iter().filter_map(|r| r.captured_at).max();

        let average_per_day = match (first_captured, last_captured) {
            (Some(first), Some(last)) => {
                let days = (last - first).num_seconds() as f64 / 86_400.0;
                total as f64 / days.max(1.0)
            }
            _ => 0.0,
        };

        let mut by_likes: Vec<&MediaRecord> = records.iter().collect();
        by_likes.sort_by(|a, b| b.like_count.cmp(&a.like_count));
        let top_liked = by_likes.into_iter().take(TOP_LIKED).cloned().collect();

        Self {
            total,
            first_captured,
            last_captured,
            average_per_day,
            top_liked,
        }
    }
}
