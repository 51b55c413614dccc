//! Feed retrieval and parsing.
//!
//! Every configured source goes through the same two steps:
//!
//! 1. **Fetching**: download the feed document over HTTP ([`fetcher`])
//! 2. **Parsing**: pull the first `max_items` entries out of it ([`parser`])
//!
//! A failure in either step only affects its own source: the pipeline logs
//! a warning, counts the source as failed and moves on.

pub mod fetcher;
pub mod parser;

use crate::error::FetchError;
use crate::models::{RawEntry, SourceDescriptor};
use tracing::{debug, instrument};

pub use fetcher::{FeedFetch, HttpFetcher};
pub use parser::parse_feed;

/// Fetch and parse one source.
///
/// # Arguments
///
/// * `fetcher` - Transport for the feed document
/// * `source` - The configured source; only its `url` is requested
/// * `max_items` - Hard cap on entries returned, in feed order
///
/// # Errors
///
/// Download and parse failures are returned as a [`FetchError`]. The
/// pipeline turns them into an empty, logged, skipped source.
#[instrument(level = "info", skip_all, fields(source = %source.display_name(), url = %source.url))]
pub async fn fetch<F: FeedFetch>(
    fetcher: &F,
    source: &SourceDescriptor,
    max_items: usize,
) -> Result<Vec<RawEntry>, FetchError> {
    let body = fetcher.fetch_document(&source.url).await?;
    debug!(bytes = body.len(), "Downloaded feed");
    parse_feed(&body, max_items)
}
