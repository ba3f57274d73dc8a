//! Session-owning pagination controller
//!
//! A [`FeedController`] owns at most one active session: the query, its
//! [`MediaStore`], its [`PaginationState`] and the profile header. Starting a new
//! search replaces the session wholesale under a fresh [`SessionToken`]. Every fetch
//! remembers the token it was started under and its result is discarded if the token
//! no longer matches when it resolves.
//!
//! Only one page fetch per session is ever outstanding. Signals that arrive while a
//! fetch is in flight are dropped, not queued.

use crate::analytics::FeedAnalytics;
use crate::client::{MediaProxy, PageFetcher};
use crate::config::{ExportConfig, FeedConfig};
use crate::error::{Error, Result};
use crate::export::{ArchiveExporter, ExportSnapshot};
use crate::feed::FeedQuery;
use crate::pagination::{PaginationAction, PaginationState, ProximitySignal, SkipReason};
use crate::store::MediaStore;
use crate::types::{FeedEvent, MediaRecord, PageResponse, ProfileRecord, SessionToken};
use crate::view::{FilterSpec, project};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State of one search session
#[derive(Debug)]
struct Session {
    token: SessionToken,
    query: FeedQuery,
    store: MediaStore,
    pagination: PaginationState,
    profile: Option<ProfileRecord>,
}

impl Session {
    fn new(token: SessionToken, query: FeedQuery) -> Self {
        Self {
            token,
            query,
            store: MediaStore::new(),
            pagination: PaginationState::default(),
            profile: None,
        }
    }

    /// Append a page and advance the cursor; returns the number of records added
    fn apply_page(&mut self, page: PageResponse) -> usize {
        self.pagination.complete(&page);
        if page.profile.is_some() {
            self.profile = page.profile;
        }
        self.store.append(&self.query, page.media)
    }
}

/// Read-only summary of the active session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionInfo {
    /// Session token
    pub token: SessionToken,
    /// Query the session was started with
    pub query: FeedQuery,
    /// Pagination state
    pub pagination: PaginationState,
    /// Records loaded so far
    pub items: usize,
    /// Profile header, for profile feeds
    pub profile: Option<ProfileRecord>,
}

/// Result of a successful [`FeedController::start_session`]
#[derive(Clone, Debug, PartialEq)]
pub struct FirstPage {
    /// Token of the new session
    pub session: SessionToken,
    /// Records added by the first page
    pub added: usize,
    /// Whether the feed is already exhausted
    pub exhausted: bool,
    /// Profile header, for profile feeds
    pub profile: Option<ProfileRecord>,
}

/// Result of a [`FeedController::maybe_fetch_next`] call
#[derive(Debug)]
pub enum FetchOutcome {
    /// The signal did not trigger a fetch
    Skipped(SkipReason),
    /// A page was fetched and appended
    Appended {
        /// Records added
        added: usize,
        /// Records in the store after the append
        total: usize,
        /// Whether the backend reported the last page
        exhausted: bool,
    },
    /// The fetch failed; the session is intact and a later signal may retry
    Failed(Error),
    /// The page arrived after a newer search replaced the session and was dropped
    Discarded,
}

/// Clears the in-flight flag of the session it was armed for, on every exit path
/// including a dropped future
struct InFlight<'a> {
    slot: &'a Mutex<Option<Session>>,
    token: SessionToken,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(slot: &'a Mutex<Option<Session>>, token: SessionToken) -> Self {
        Self {
            slot,
            token,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut guard = lock(self.slot);
        if let Some(session) = guard.as_mut()
            && session.token == self.token
        {
            debug!(session = %self.token, "page fetch abandoned, clearing in-flight flag");
            session.pagination.fail();
        }
    }
}

fn lock(slot: &Mutex<Option<Session>>) -> MutexGuard<'_, Option<Session>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives page fetches for one feed view (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct FeedController {
    fetcher: Arc<dyn PageFetcher>,
    config: Arc<FeedConfig>,
    session: Arc<Mutex<Option<Session>>>,
    next_token: Arc<AtomicU64>,
    event_tx: broadcast::Sender<FeedEvent>,
}

impl std::fmt::Debug for FeedController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedController")
            .field("config", &self.config)
            .field("session", &self.session_info())
            .finish_non_exhaustive()
    }
}

impl FeedController {
    /// Create a controller with no active session
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: FeedConfig) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            fetcher,
            config: Arc::new(config),
            session: Arc::new(Mutex::new(None)),
            next_token: Arc::new(AtomicU64::new(0)),
            event_tx,
        }
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: FeedEvent) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Start a new search, replacing any previous session, and load its first page
    ///
    /// # Errors
    ///
    /// - [`Error::FetchFailed`] if the first page cannot be fetched; the session is
    ///   left with an empty store and idle pagination
    /// - [`Error::SessionSuperseded`] if another search started before the first page
    ///   arrived
    pub async fn start_session(&self, query: FeedQuery) -> Result<FirstPage> {
        let token = SessionToken(self.next_token.fetch_add(1, Ordering::SeqCst) + 1);
        {
            let mut guard = lock(&self.session);
            let mut session = Session::new(token, query.clone());
            session.pagination.begin_fetch();
            *guard = Some(session);
        }

        info!(session = %token, %query, "starting feed session");
        self.emit(FeedEvent::SessionStarted {
            session: token,
            query: query.to_string(),
        });

        let mut in_flight = InFlight::new(&self.session, token);
        let result = self
            .fetcher
            .fetch_page(&query, 0, self.config.page_size)
            .await;
        in_flight.disarm();

        let mut guard = lock(&self.session);
        let Some(session) = guard.as_mut().filter(|s| s.token == token) else {
            debug!(session = %token, "first page arrived after the session was replaced");
            self.emit(FeedEvent::StalePageDiscarded { session: token });
            return Err(Error::SessionSuperseded { token: token.0 });
        };

        match result {
            Ok(page) => {
                let added = session.apply_page(page);
                let total = session.store.len();
                let exhausted = session.pagination.exhausted;

                info!(session = %token, added, exhausted, "first page loaded");
                self.emit(FeedEvent::PageAppended {
                    session: token,
                    added,
                    total,
                    cursor: session.pagination.cursor,
                });
                if exhausted {
                    self.emit(FeedEvent::FeedExhausted {
                        session: token,
                        total,
                    });
                }

                Ok(FirstPage {
                    session: token,
                    added,
                    exhausted,
                    profile: session.profile.clone(),
                })
            }
            Err(e) => {
                session.pagination.fail();
                warn!(session = %token, error = %e, "first page failed");
                self.emit(FeedEvent::PageFailed {
                    session: token,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetch the next page if the proximity signal calls for it
    ///
    /// A no-op unless a session is active, the feed is not exhausted, no fetch is in
    /// flight, something from this session is rendered, and the viewport is within
    /// the configured threshold of the content end. Failures are logged and returned as
    /// [`FetchOutcome::Failed`] without marking the feed exhausted.
    pub async fn maybe_fetch_next(&self, signal: ProximitySignal) -> FetchOutcome {
        let (token, query, cursor) = {
            let mut guard = lock(&self.session);
            let Some(session) = guard.as_mut() else {
                return FetchOutcome::Skipped(SkipReason::NoSession);
            };

            // Nothing can be rendered beyond what this session holds
            let signal = ProximitySignal {
                rendered_items: signal.rendered_items.min(session.store.len()),
                ..signal
            };

            match session
                .pagination
                .next_action(&signal, self.config.proximity_threshold)
            {
                PaginationAction::Skip(reason) => {
                    debug!(session = %session.token, ?reason, "proximity signal ignored");
                    return FetchOutcome::Skipped(reason);
                }
                PaginationAction::Fetch { cursor } => {
                    session.pagination.begin_fetch();
                    (session.token, session.query.clone(), cursor)
                }
            }
        };

        let mut in_flight = InFlight::new(&self.session, token);
        let result = self
            .fetcher
            .fetch_page(&query, cursor, self.config.page_size)
            .await;
        in_flight.disarm();

        let mut guard = lock(&self.session);
        let Some(session) = guard.as_mut().filter(|s| s.token == token) else {
            debug!(session = %token, cursor, "discarding page for replaced session");
            self.emit(FeedEvent::StalePageDiscarded { session: token });
            return FetchOutcome::Discarded;
        };

        match result {
            Ok(page) => {
                let added = session.apply_page(page);
                let total = session.store.len();
                let exhausted = session.pagination.exhausted;

                debug!(session = %token, cursor, added, total, "page appended");
                self.emit(FeedEvent::PageAppended {
                    session: token,
                    added,
                    total,
                    cursor: session.pagination.cursor,
                });
                if exhausted {
                    info!(session = %token, total, "feed exhausted");
                    self.emit(FeedEvent::FeedExhausted {
                        session: token,
                        total,
                    });
                }

                FetchOutcome::Appended {
                    added,
                    total,
                    exhausted,
                }
            }
            Err(e) => {
                session.pagination.fail();
                warn!(session = %token, cursor, error = %e, "failed to load next page");
                self.emit(FeedEvent::PageFailed {
                    session: token,
                    error: e.to_string(),
                });
                FetchOutcome::Failed(e)
            }
        }
    }

    /// Filtered and sorted view of the active session
    ///
    /// The tag filter only applies to feeds that support it.
    pub fn view(&self, spec: &FilterSpec) -> Vec<MediaRecord> {
        let guard = lock(&self.session);
        let Some(session) = guard.as_ref() else {
            return Vec::new();
        };

        if session.query.kind().supports_tag_filter() {
            project(session.store.records(), spec)
        } else {
            project(session.store.records(), &spec.without_tags())
        }
    }

    /// Records of the active session in append order
    pub fn snapshot(&self) -> Vec<MediaRecord> {
        lock(&self.session)
            .as_ref()
            .map(|s| s.store.snapshot())
            .unwrap_or_default()
    }

    /// Summary of the active session
    pub fn session_info(&self) -> Option<SessionInfo> {
        lock(&self.session).as_ref().map(|s| SessionInfo {
            token: s.token,
            query: s.query.clone(),
            pagination: s.pagination,
            items: s.store.len(),
            profile: s.profile.clone(),
        })
    }

    /// Analytics over the active session's records
    pub fn analytics(&self) -> FeedAnalytics {
        lock(&self.session)
            .as_ref()
            .map(|s| FeedAnalytics::compute(s.store.records()))
            .unwrap_or_default()
    }

    /// Immutable copy of the session for export; later appends do not affect it
    pub fn export_snapshot(&self) -> Option<ExportSnapshot> {
        lock(&self.session).as_ref().map(|s| ExportSnapshot {
            query: s.query.clone(),
            profile: s.profile.clone(),
            records: s.store.snapshot(),
        })
    }

    /// Archive exporter that reports through this controller's event channel
    pub fn archive_exporter(
        &self,
        proxy: Arc<dyn MediaProxy>,
        config: ExportConfig,
    ) -> ArchiveExporter {
        ArchiveExporter::new(proxy, config).with_events(self.event_tx.clone())
    }
}
