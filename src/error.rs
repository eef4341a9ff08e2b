//! Error types shared by the sync core and its collaborators.
//!
//! Every failure that can reach the user maps onto one of the three
//! [`FeedError`] variants.  None of them is fatal to the controller: the
//! triggering operation ends, a notice is surfaced, and previously loaded
//! articles stay on screen.

use std::path::PathBuf;

use thiserror::Error;

/// Why a feed load did not produce fresh articles.
#[derive(Debug, Error)]
pub enum FeedError {
    /// No connectivity and nothing cached to fall back on.
    #[error("no network connection and no cached articles")]
    Offline,

    /// Connected, but the request failed, timed out or returned non-2xx.
    #[error("headlines request failed: {0}")]
    NetworkFailure(String),

    /// The response body did not match the expected shape.
    #[error("malformed headlines response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::NetworkFailure(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::MalformedResponse(err.to_string())
    }
}

/// Failures of the local key-value cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("an API key is required (pass --api-key or set NEWSAPI_KEY)")]
    MissingApiKey,

    #[error("page size must be between 1 and {max}, got {got}")]
    PageSize { got: u32, max: u32 },

    #[error("invalid endpoint URL {url:?}: {reason}")]
    Endpoint { url: String, reason: String },

    #[error("no cache directory available; pass --cache-dir")]
    NoCacheDir,
}
