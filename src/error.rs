//! Error types for each stage of the digest pipeline.
//!
//! Only [`ConfigError`] is fatal. Everything else is recovered close to
//! where it happens: a failed feed skips one source, a failed completion
//! falls back to the original summary, a failed store call skips one
//! article.

use thiserror::Error;

/// Required configuration or credentials are missing or malformed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required credential {0}")]
    MissingCredential(&'static str),

    #[error("invalid URL for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

/// Retrieving or parsing a single feed failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed feed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<feed_rs::parser::ParseFeedError> for FetchError {
    fn from(err: feed_rs::parser::ParseFeedError) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// A generative completion request failed.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("empty completion")]
    EmptyResponse,
}

impl AskError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AskError::RateLimited(_))
    }
}

impl From<reqwest::Error> for AskError {
    fn from(err: reqwest::Error) -> Self {
        AskError::Network(err.to_string())
    }
}

/// A table store call (existence check, insert, settings lookup) failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("store returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode store response: {0}")]
    Decode(String),

    #[error("invalid store URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}
