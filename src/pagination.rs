//! Pagination state and the fetch-or-skip decision
//!
//! The decision is a pure function of the current [`PaginationState`] and a
//! [`ProximitySignal`]. How the signal is produced (scroll events, a timer, a
//! "load more" button) is up to the caller.

use crate::types::PageResponse;
use serde::{Deserialize, Serialize};

/// Cursor, exhaustion flag, and in-flight guard of one session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Backend cursor for the next page
    pub cursor: u64,
    /// Set once the backend reports no further pages
    pub exhausted: bool,
    /// At most one page fetch may be outstanding
    pub fetch_in_flight: bool,
}

impl PaginationState {
    /// Decide whether a proximity signal should trigger the next page
    pub fn next_action(&self, signal: &ProximitySignal, threshold: f64) -> PaginationAction {
        if self.exhausted {
            return PaginationAction::Skip(SkipReason::Exhausted);
        }
        if self.fetch_in_flight {
            return PaginationAction::Skip(SkipReason::FetchInFlight);
        }
        if signal.rendered_items == 0 {
            return PaginationAction::Skip(SkipReason::NothingRendered);
        }
        // NaN on either side is never near the end
        let near_end = signal.distance_to_end() < threshold;
        if !near_end {
            return PaginationAction::Skip(SkipReason::NotNearEnd);
        }
        PaginationAction::Fetch {
            cursor: self.cursor,
        }
    }

    /// Mark a fetch as started
    pub(crate) fn begin_fetch(&mut self) {
        self.fetch_in_flight = true;
    }

    /// Apply a successful page: the backend's cursor is authoritative
    pub(crate) fn complete(&mut self, page: &PageResponse) {
        self.cursor = page.offset;
        self.exhausted = !page.has_more;
        self.fetch_in_flight = false;
    }

    /// Clear the in-flight guard after a failed fetch, leaving cursor and exhaustion alone
    pub(crate) fn fail(&mut self) {
        self.fetch_in_flight = false;
    }
}

/// Where the viewport sits relative to the end of the rendered content
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProximitySignal {
    /// Layout position of the end of the rendered content
    pub content_end: f64,
    /// Current scroll offset
    pub scroll_offset: f64,
    /// Viewport height
    pub viewport_height: f64,
    /// Number of items currently rendered
    pub rendered_items: usize,
}

impl ProximitySignal {
    /// Signal from scroll geometry
    pub fn new(
        content_end: f64,
        scroll_offset: f64,
        viewport_height: f64,
        rendered_items: usize,
    ) -> Self {
        Self {
            content_end,
            scroll_offset,
            viewport_height,
            rendered_items,
        }
    }

    /// Signal for an explicit "load more" request; always at the end of the content
    pub fn at_end(rendered_items: usize) -> Self {
        Self::new(0.0, 0.0, 0.0, rendered_items)
    }

    /// Remaining distance between the bottom of the viewport and the end of the content
    pub fn distance_to_end(&self) -> f64 {
        self.content_end - (self.scroll_offset + self.viewport_height)
    }
}

/// Outcome of the pagination decision
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginationAction {
    /// Fetch the page at this cursor
    Fetch {
        /// Cursor to request
        cursor: u64,
    },
    /// Do nothing
    Skip(SkipReason),
}

/// Why a proximity signal did not trigger a fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No search has been started
    NoSession,
    /// The backend reported no further pages
    Exhausted,
    /// Another fetch is already outstanding
    FetchInFlight,
    /// Nothing rendered yet
    NothingRendered,
    /// Viewport not within the threshold of the content end
    NotNearEnd,
}
