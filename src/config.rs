//! Configuration types for feedscope

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend connection settings
///
/// Groups settings for reaching the page, proxy, and health endpoints.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend (default: "http://127.0.0.1:5000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for page and health requests (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Timeout for a single proxied media download (default: 20 seconds)
    #[serde(default = "default_proxy_timeout", with = "duration_serde")]
    pub proxy_timeout: Duration,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            proxy_timeout: default_proxy_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Pagination behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Items requested per page (default: 12)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Distance from the end of the rendered content, in layout units, under which
    /// a proximity signal triggers the next page (default: 400)
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            proximity_threshold: default_proximity_threshold(),
        }
    }
}

/// Archive export behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Place archive entries under a folder named after the session (default: true)
    #[serde(default = "default_true")]
    pub group_in_folder: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            group_in_folder: true,
        }
    }
}

/// Main configuration for a [`FeedController`](crate::FeedController) and its
/// [`BackendClient`](crate::BackendClient)
///
/// - [`backend`](BackendConfig) - where the backend lives and how long to wait for it
/// - [`feed`](FeedConfig) - page size and scroll proximity threshold
/// - [`export`](ExportConfig) - archive layout
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Pagination behavior
    #[serde(default)]
    pub feed: FeedConfig,

    /// Archive export behavior
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Check the configuration for values the pipeline cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key when the base URL does not
    /// parse, the page size is zero, or the proximity threshold is not positive.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.backend.base_url)
            .map_err(|e| Error::config("base_url", format!("invalid base URL: {}", e)))?;
        if url.cannot_be_a_base() {
            return Err(Error::config(
                "base_url",
                format!("{} cannot be used as a base URL", self.backend.base_url),
            ));
        }

        if self.feed.page_size == 0 {
            return Err(Error::config("page_size", "page size must be greater than zero"));
        }

        let threshold = self.feed.proximity_threshold;
        if threshold.is_nan() || threshold <= 0.0 {
            return Err(Error::config(
                "proximity_threshold",
                "proximity threshold must be a positive number",
            ));
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_proxy_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_user_agent() -> String {
    concat!("feedscope/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_page_size() -> usize {
    12
}

fn default_proximity_threshold() -> f64 {
    400.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
