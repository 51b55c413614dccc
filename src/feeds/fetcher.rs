//! HTTP retrieval of feed documents.

use crate::error::FetchError;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("news_digest/", env!("CARGO_PKG_VERSION"));

/// Source of raw feed documents.
pub trait FeedFetch {
    /// Return the body of the document at `url`.
    ///
    /// # Errors
    ///
    /// [`FetchError::Network`] for transport failures and
    /// [`FetchError::Status`] for non-2xx responses.
    async fn fetch_document(&self, url: &str) -> Result<String, FetchError>;
}

/// [`FeedFetch`] over plain HTTP(S) with a fixed timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FeedFetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_document(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Fetched feed document"
        );
        Ok(body)
    }
}
