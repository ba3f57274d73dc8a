//! HTTP backend client
//!
//! The pipeline only talks to the backend through two traits:
//! - [`PageFetcher`] - one page of raw items for a query, cursor and page size
//! - [`MediaProxy`] - raw bytes of an upstream media URL via the backend proxy
//!
//! [`BackendClient`] implements both over `reqwest` and also exposes the health probe
//! and the profile extras endpoint.

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::feed::FeedQuery;
use crate::types::{BackendHealth, PageResponse, RawItem};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Source of feed pages
///
/// # Errors
///
/// Implementations return [`Error::FetchFailed`] for transport failures, non-2xx
/// responses, and bodies that are not a valid page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page of `query` starting at `offset`
    async fn fetch_page(&self, query: &FeedQuery, offset: u64, limit: usize)
    -> Result<PageResponse>;
}

/// Passthrough fetch of upstream media bytes
#[async_trait]
pub trait MediaProxy: Send + Sync {
    /// Download the resource behind `url`
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>>;
}

/// A highlight item, tagged with the title of the highlight reel it belongs to
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightItem {
    /// Highlight reel title
    #[serde(default)]
    pub highlight_title: String,
    /// The media item
    #[serde(flatten)]
    pub item: RawItem,
}

/// Stories, highlights and reels of a profile
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileExtras {
    /// Backend could not log in; the lists are empty
    #[serde(default)]
    pub requires_login: bool,
    /// Active stories
    #[serde(default)]
    pub stories: Vec<RawItem>,
    /// Highlight items
    #[serde(default)]
    pub highlights: Vec<HighlightItem>,
    /// Recent video posts
    #[serde(default)]
    pub reels: Vec<RawItem>,
}

/// `reqwest`-backed client for the feed backend
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    proxy_timeout: Duration,
}

impl BackendClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL does not parse and
    /// [`Error::FetchFailed`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::config("base_url", format!("invalid base URL: {}", e)))?;

        // Url::join replaces the last path segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            proxy_timeout: config.proxy_timeout,
        })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Proxy URL for displaying or downloading an upstream media URL
    pub fn proxied_url(&self, upstream: &str) -> String {
        format!("{}proxy?u={}", self.base_url, urlencoding::encode(upstream))
    }

    /// Probe the backend's health endpoint
    ///
    /// Never fails: an unreachable or unhealthy backend is reported as
    /// [`BackendHealth::Offline`].
    pub async fn health(&self) -> BackendHealth {
        let url = match self.endpoint("health") {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "cannot build health URL");
                return BackendHealth::Offline;
            }
        };

        match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => BackendHealth::Online,
            Ok(response) => {
                debug!(status = %response.status(), "backend health check failed");
                BackendHealth::Offline
            }
            Err(e) => {
                debug!(error = %e, "backend unreachable");
                BackendHealth::Offline
            }
        }
    }

    /// Fetch stories, highlights and reels for a profile
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] on transport failure, non-2xx or malformed body.
    pub async fn profile_extras(&self, username: &str) -> Result<ProfileExtras> {
        let url = self.endpoint("api/profile_extras")?;
        self.get_json(url, &[("username", username.to_string())])
            .await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::config("base_url", format!("cannot resolve {}: {}", path, e)))
    }

    /// GET a JSON document, mapping every failure to [`Error::FetchFailed`]
    async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("timed out requesting {}", url.path())
                } else if e.is_connect() {
                    format!("could not connect to backend: {}", e)
                } else {
                    format!("request to {} failed: {}", url.path(), e)
                };
                Error::fetch(message)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::FetchFailed {
            message: format!("failed to read response body: {}", e),
            status: Some(status.as_u16()),
        })?;

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|_| {
            warn!(path = url.path(), status = %status, "backend returned non-JSON body");
            Error::FetchFailed {
                message: "backend returned non-JSON".to_string(),
                status: Some(status.as_u16()),
            }
        })?;

        if !status.is_success() {
            let message = value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("request failed with HTTP {}", status.as_u16()));
            return Err(Error::FetchFailed {
                message,
                status: Some(status.as_u16()),
            });
        }

        serde_json::from_value(value).map_err(|e| Error::FetchFailed {
            message: format!("malformed response from {}: {}", url.path(), e),
            status: Some(status.as_u16()),
        })
    }
}

#[async_trait]
impl PageFetcher for BackendClient {
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        offset: u64,
        limit: usize,
    ) -> Result<PageResponse> {
        let kind = query.kind();
        let url = self.endpoint(kind.endpoint())?;

        debug!(%query, offset, limit, "fetching page");
        self.get_json(
            url,
            &[
                (kind.query_param(), query.identifier()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl MediaProxy for BackendClient {
    async fn fetch_media(&self, upstream: &str) -> Result<Vec<u8>> {
        let proxied = self.proxied_url(upstream);

        let response = self
            .http
            .get(&proxied)
            .timeout(self.proxy_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::fetch(format!(
                        "proxy timed out after {:?} for {}",
                        self.proxy_timeout, upstream
                    ))
                } else {
                    Error::fetch(format!("proxy request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchFailed {
                message: format!("proxy returned HTTP {}", status.as_u16()),
                status: Some(status.as_u16()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| Error::FetchFailed {
            message: format!("failed to read proxied body: {}", e),
            status: Some(status.as_u16()),
        })?;

        Ok(bytes.to_vec())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaKind;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: base_url.to_string(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_profile_page_sends_cursor_and_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/scrape"))
            .and(query_param("username", "alice"))
            .and(query_param("offset", "12"))
            .and(query_param("limit", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "profile": {"username": "alice", "posts_count": 14},
                "media": [
                    {"type": "image", "thumb_url": "https://cdn.example/a.jpg", "likes": 3},
                    {"type": "video", "thumb_url": "https://cdn.example/b.jpg",
                     "video_url": "https://cdn.example/b.mp4"}
                ],
                "offset": 14,
                "has_more": false
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let query = FeedQuery::profile("alice").unwrap();
        let page = client.fetch_page(&query, 12, 12).await.unwrap();

        assert_eq!(page.media.len(), 2);
        assert_eq!(page.media[1].kind, MediaKind::Video);
        assert_eq!(page.offset, 14);
        assert!(!page.has_more);
        assert_eq!(page.profile.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn fetch_hashtag_page_joins_tags() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/hashtag"))
            .and(query_param("tags", "cats,dogs"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tags": ["cats", "dogs"],
                "primary_tag": "cats",
                "media": [{"type": "image", "thumb_url": "t", "owner_username": "bob"}],
                "offset": 1,
                "has_more": true
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let query = FeedQuery::hashtags("#cats, dogs").unwrap();
        let page = client.fetch_page(&query, 0, 12).await.unwrap();

        assert_eq!(page.media[0].owner_username.as_deref(), Some("bob"));
        assert!(page.has_more);
        assert!(page.profile.is_none());
    }

    #[tokio::test]
    async fn error_field_becomes_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/scrape"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "Profile not found"})),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let err = client
            .fetch_page(&FeedQuery::profile("ghost").unwrap(), 0, 12)
            .await
            .unwrap_err();

        match err {
            Error::FetchFailed { message, status } => {
                assert_eq!(message, "Profile not found");
                assert_eq!(status, Some(404));
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_without_message_reports_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/scrape"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({})))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let err = client
            .fetch_page(&FeedQuery::profile("alice").unwrap(), 0, 12)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "fetch failed: request failed with HTTP 500");
    }

    #[tokio::test]
    async fn non_json_body_is_fetch_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let err = client
            .fetch_page(&FeedQuery::profile("alice").unwrap(), 0, 12)
            .await
            .unwrap_err();

        match err {
            Error::FetchFailed { message, status } => {
                assert!(message.contains("non-JSON"));
                assert_eq!(status, Some(200));
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn json_without_cursor_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"media": []})))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let err = client
            .fetch_page(&FeedQuery::profile("alice").unwrap(), 0, 12)
            .await
            .unwrap_err();

        assert!(err.is_fetch_failure());
        assert!(err.to_string().contains("malformed response"));
    }

    #[tokio::test]
    async fn proxy_returns_bytes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/proxy"))
            .and(query_param("u", "https://cdn.example/a b.jpg?x=1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let bytes = client
            .fetch_media("https://cdn.example/a b.jpg?x=1")
            .await
            .unwrap();

        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn proxy_error_status_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/proxy"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let err = client.fetch_media("https://cdn.example/x.jpg").await.unwrap_err();

        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn health_online_and_offline() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        assert_eq!(client.health().await, BackendHealth::Online);

        let unhealthy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&unhealthy)
            .await;
        assert_eq!(
            client_for(&unhealthy.uri()).health().await,
            BackendHealth::Offline
        );
    }

    #[tokio::test]
    async fn health_unreachable_is_offline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{}", addr));
        assert_eq!(client.health().await, BackendHealth::Offline);
    }

    #[tokio::test]
    async fn profile_extras_parses_highlights() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/profile_extras"))
            .and(query_param("username", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "requires_login": false,
                "stories": [{"type": "image", "thumb_url": "s1"}],
                "highlights": [{"highlight_title": "Trips", "type": "video",
                                "thumb_url": "h1", "video_url": "h1.mp4"}],
                "reels": []
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let extras = client.profile_extras("alice").await.unwrap();

        assert!(!extras.requires_login);
        assert_eq!(extras.stories.len(), 1);
        assert_eq!(extras.highlights[0].highlight_title, "Trips");
        assert_eq!(extras.highlights[0].item.kind, MediaKind::Video);
        assert!(extras.reels.is_empty());
    }

    #[test]
    fn proxied_url_percent_encodes_upstream() {
        let client = client_for("http://localhost:5000");

        assert_eq!(
            client.proxied_url("https://cdn.example/a.jpg?x=1&y=2"),
            "http://localhost:5000/proxy?u=https%3A%2F%2Fcdn.example%2Fa.jpg%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn base_path_is_preserved() {
        let client = client_for("http://localhost:5000/viewer");

        assert_eq!(client.base_url().as_str(), "http://localhost:5000/viewer/");
        assert_eq!(
            client.endpoint("api/scrape").unwrap().as_str(),
            "http://localhost:5000/viewer/api/scrape"
        );
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let result = BackendClient::new(&BackendConfig {
            base_url: "::nope::".into(),
            ..BackendConfig::default()
        });

        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
