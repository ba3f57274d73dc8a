//! Error types for feedscope
//!
//! Every fallible operation in the crate returns [`Result`]. The variants map onto the
//! three failure classes of the feed pipeline:
//! - page or proxy fetches that fail ([`Error::FetchFailed`])
//! - metadata export encoding ([`Error::SerializationFailed`])
//! - a single item failing during archive packaging ([`Error::ItemExportFailed`])

use thiserror::Error;

/// Result type alias for feedscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for feedscope
#[derive(Debug, Error)]
pub enum Error {
    /// A page fetch or proxy fetch failed (transport error, non-2xx, non-JSON body)
    #[error("fetch failed: {message}")]
    FetchFailed {
        /// Human-readable message, taken from the backend's `error` field when present
        message: String,
        /// HTTP status code, if a response was received at all
        status: Option<u16>,
    },

    /// Metadata export could not be encoded
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// A single item could not be added to an archive export
    #[error("failed to export {file_name}: {reason}")]
    ItemExportFailed {
        /// Archive entry name the item would have been stored under
        file_name: String,
        /// Why the item was skipped
        reason: String,
    },

    /// Archive writer error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// The search input did not describe a usable feed query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A filter or sort setting did not name a known value
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The session this result belonged to was replaced by a newer search
    #[error("session {token} was superseded by a newer search")]
    SessionSuperseded {
        /// Token of the session that was replaced
        token: u64,
    },
}

impl Error {
    /// Build a [`Error::FetchFailed`] without an HTTP status
    pub fn fetch(message: impl Into<String>) -> Self {
        Error::FetchFailed {
            message: message.into(),
            status: None,
        }
    }

    /// Build a [`Error::Config`] pointing at a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Whether this error came from a network fetch (page or proxy)
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::FetchFailed { .. })
    }

    /// HTTP status of a failed fetch, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::FetchFailed { status, .. } => *status,
            _ => None,
        }
    }
}
