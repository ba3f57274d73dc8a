//! # feedscope
//!
//! Client-side core for browsing paginated media feeds (profile posts or hashtag
//! posts) served by a scraping backend.
//!
//! ## Design Philosophy
//!
//! feedscope is designed to be:
//! - **Session-scoped** - A new search replaces all state; late pages from an old
//!   search are dropped
//! - **Fetch-once** - Filters and sort orders are recomputed locally, never re-fetched
//! - **Library-first** - No UI; the caller feeds in scroll geometry and renders views
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use feedscope::{BackendClient, Config, FeedController, FeedQuery, FilterSpec, ProximitySignal};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let client = Arc::new(BackendClient::new(&config.backend)?);
//!     let feed = FeedController::new(client.clone(), config.feed.clone());
//!
//!     // Subscribe to events
//!     let mut events = feed.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let first = feed.start_session(FeedQuery::profile("nasa")?).await?;
//!     println!("loaded {} posts", first.added);
//!
//!     // Called from the UI whenever the viewport moves
//!     feed.maybe_fetch_next(ProximitySignal::new(4200.0, 3500.0, 800.0, first.added))
//!         .await;
//!
//!     let view = feed.view(&FilterSpec::default());
//!     println!("showing {} posts", view.len());
//!
//!     if let Some(snapshot) = feed.export_snapshot() {
//!         let exporter = feed.archive_exporter(client, config.export.clone());
//!         if let Some(archive) = exporter
//!             .export(&snapshot, |p| println!("{}/{}", p.done, p.total))
//!             .await?
//!         {
//!             std::fs::write(&archive.file_name, &archive.bytes)?;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Feed analytics
pub mod analytics;
/// Backend HTTP client and collaborator traits
pub mod client;
/// Configuration types
pub mod config;
/// Session-owning pagination controller
pub mod controller;
/// Error types
pub mod error;
/// Metadata and archive export
pub mod export;
/// Feed kinds and queries
pub mod feed;
/// Pagination state machine
pub mod pagination;
/// Per-session media store and normalization
pub mod store;
/// Core types and events
pub mod types;
/// Filtered and sorted views
pub mod view;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use analytics::FeedAnalytics;
pub use client::{BackendClient, MediaProxy, PageFetcher, ProfileExtras};
pub use config::{BackendConfig, Config, ExportConfig, FeedConfig};
pub use controller::{FeedController, FetchOutcome, FirstPage, SessionInfo};
pub use error::{Error, Result};
pub use export::{ArchiveExporter, ArchiveOutput, ExportSnapshot, SkippedItem, export_metadata};
pub use feed::{FeedKind, FeedQuery};
pub use pagination::{PaginationAction, PaginationState, ProximitySignal, SkipReason};
pub use store::MediaStore;
pub use types::{
    BackendHealth, ExportProgress, FeedEvent, MediaId, MediaKind, MediaRecord, PageResponse,
    ProfileRecord, RawItem, SessionToken,
};
pub use view::{FilterSpec, KindFilter, Preset, SortOrder, project};
