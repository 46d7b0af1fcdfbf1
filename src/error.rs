//! Error types for the feed client and the poller.

use thiserror::Error;

/// Errors returned by a [`FeedClient`](crate::source::FeedClient).
///
/// Every variant is transient from the poller's point of view: it logs the
/// error and retries after the fallback interval.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    ///
    /// The URL is stripped on conversion: it carries the API key.
    #[error("request failed: {0}")]
    Request(reqwest::Error),

    /// The origin answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, kept for the log
        body: String,
    },

    /// The body was not the JSON document we expected.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request URL could not be built.
    #[error("invalid request URL: {0}")]
    Url(String),
}

impl FeedError {
    /// Build a status error from a code and body text.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error.without_url())
    }
}

/// Errors from the poller lifecycle.
#[derive(Debug, Error)]
pub enum PollerError {
    /// The background thread could not be spawned.
    #[error("failed to spawn poller thread: {0}")]
    Spawn(#[from] std::io::Error),
}
