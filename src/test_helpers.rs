//! Shared test doubles for the fetch and proxy seams.

use crate::client::{MediaProxy, PageFetcher};
use crate::error::{Error, Result};
use crate::feed::FeedQuery;
use crate::types::{MediaId, MediaKind, MediaRecord, PageResponse, RawItem};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

struct Step {
    gate: Option<oneshot::Receiver<()>>,
    result: Result<PageResponse>,
}

/// In-memory [`PageFetcher`] that replays scripted pages in order.
///
/// Gated steps block until their sender fires (or is dropped), which lets tests hold
/// a fetch in flight while they poke at the controller.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, u64, usize)>>,
}

impl ScriptedFetcher {
    pub(crate) fn push_page(&self, page: PageResponse) {
        self.push(None, Ok(page));
    }

    pub(crate) fn push_failure(&self, message: &str) {
        self.push(None, Err(Error::fetch(message)));
    }

    /// Queue a page that is only returned once the returned sender fires
    pub(crate) fn push_gated(&self, page: PageResponse) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(Some(rx), Ok(page));
        tx
    }

    fn push(&self, gate: Option<oneshot::Receiver<()>>, result: Result<PageResponse>) {
        self.steps
            .lock()
            .unwrap()
            .push_back(Step { gate, result });
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(identifier, offset, limit)` of every request, in call order
    pub(crate) fn requests(&self) -> Vec<(String, u64, usize)> {
        self.requests.lock().unwrap().clone()
    }

    /// Yield until at least `n` fetches have started
    pub(crate) async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        offset: u64,
        limit: usize,
    ) -> Result<PageResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((query.identifier(), offset, limit));
        let step = self.steps.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);

        let Some(step) = step else {
            return Err(Error::fetch("no scripted page left"));
        };
        if let Some(gate) = step.gate {
            gate.await.ok();
        }
        step.result
    }
}

/// In-memory [`MediaProxy`] keyed by upstream URL; unknown URLs fail
#[derive(Default)]
pub(crate) struct MapProxy {
    bodies: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl MapProxy {
    pub(crate) fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProxy for MapProxy {
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(format!("proxy returned HTTP 404 for {url}")))
    }
}

/// Raw image item with a thumbnail derived from `n`
pub(crate) fn item(n: u64, likes: u64) -> RawItem {
    RawItem {
        thumb_url: format!("https://cdn.example/{n}.jpg"),
        likes: Some(likes),
        ..RawItem::default()
    }
}

/// Page of `count` items numbered from `first`, reporting `next_offset` as the cursor
pub(crate) fn page(first: u64, count: u64, next_offset: u64, has_more: bool) -> PageResponse {
    PageResponse {
        media: (first..first + count).map(|n| item(n, n)).collect(),
        offset: next_offset,
        has_more,
        profile: None,
    }
}

/// Normalized image record owned by `alice`
pub(crate) fn record(id: u64, likes: u64) -> MediaRecord {
    MediaRecord {
        id: MediaId(id),
        owner_handle: "alice".into(),
        kind: MediaKind::Image,
        thumbnail_url: format!("https://cdn.example/{id}.jpg"),
        playable_url: None,
        like_count: likes,
        comment_count: 0,
        caption: String::new(),
        captured_at: None,
        post_reference: None,
        tags: vec![],
    }
}
