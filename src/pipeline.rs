//! The ingest pipeline: fetch → normalize → filter → (dedupe) → summarize → persist.
//!
//! One [`Pipeline`] serves both persistence modes:
//!
//! - [`Pipeline::run_snapshot`] collects every relevant article from all
//!   sources into a sorted [`IngestResult`]
//! - [`Pipeline::run_incremental`] checks each relevant article against the
//!   store and summarizes and inserts only the unseen ones
//!
//! Everything runs sequentially. A failing source or article is logged
//! and skipped; it never aborts the run.

use crate::api::{AskAsync, Summarizer};
use crate::feeds::{self, FeedFetch};
use crate::filter::{KeywordSet, is_interesting};
use crate::models::{Article, IngestResult, SourceDescriptor};
use crate::normalize::Normalizer;
use crate::store::ArticleStore;
use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

/// Counters accumulated over one run and reported in the final log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    /// Configured sources visited, of any type.
    pub sources: usize,
    /// Non-RSS sources, recognized but not fetched.
    pub skipped_sources: usize,
    /// RSS sources whose download or parse failed.
    pub failed_sources: usize,
    /// Entries parsed across all sources, after the per-source cap.
    pub fetched: usize,
    /// Articles rejected by the keyword filter.
    pub filtered_out: usize,
    /// Entries without a URL (incremental mode only).
    pub missing_url: usize,
    /// Articles whose URL was already stored.
    pub duplicates: usize,
    /// Articles written to the snapshot or inserted into the store.
    pub added: usize,
    /// Failed existence checks and inserts.
    pub store_errors: usize,
}

/// Resolve the keyword set for this run.
///
/// # Arguments
///
/// * `store` - The table store, if one is configured
/// * `settings_key` - Key of the settings record holding `value.keywords`
/// * `fallback` - Static keywords from the configuration document
///
/// # Returns
///
/// The remote list when the store answers with one, the static list
/// otherwise.
#[instrument(level = "info", skip_all, fields(settings_key = %settings_key))]
pub async fn load_keywords<S: ArticleStore>(
    store: Option<&S>,
    settings_key: &str,
    fallback: &[String],
) -> KeywordSet {
    let Some(store) = store else {
        debug!("No store configured; using static keywords");
        return KeywordSet::new(fallback);
    };
    match store.keywords(settings_key).await {
        Ok(Some(remote)) => {
            let set = KeywordSet::new(&remote);
            info!(count = set.len(), keywords = ?set.as_slice(), "Loaded keywords from settings table");
            set
        }
        Ok(None) => {
            warn!("Settings record has no keywords; using static keywords");
            KeywordSet::new(fallback)
        }
        Err(e) => {
            warn!(error = %e, "Failed to load remote keywords; using static keywords");
            KeywordSet::new(fallback)
        }
    }
}

/// Sequential ingest over a fixed list of sources.
///
/// Generic over the feed transport `F` and the completion backend `T` so
/// the tests can drive it with in-memory fakes.
pub struct Pipeline<F, T> {
    fetcher: F,
    normalizer: Normalizer,
    summarizer: Summarizer<T>,
    sources: Vec<SourceDescriptor>,
    max_items: usize,
}

impl<F, T> Pipeline<F, T>
where
    F: FeedFetch,
    T: AskAsync,
{
    pub fn new(
        fetcher: F,
        normalizer: Normalizer,
        summarizer: Summarizer<T>,
        sources: Vec<SourceDescriptor>,
        max_items: usize,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            summarizer,
            sources,
            max_items,
        }
    }

    /// Fetch and normalize one source. `None` when the source is skipped or failed.
    async fn collect(&self, source: &SourceDescriptor, stats: &mut RunStats) -> Option<Vec<Article>> {
        stats.sources += 1;
        if !source.is_rss() {
            debug!(source = %source.display_name(), kind = ?source.kind, "Skipping non-RSS source");
            stats.skipped_sources += 1;
            return None;
        }

        match feeds::fetch(&self.fetcher, source, self.max_items).await {
            Ok(entries) => {
                stats.fetched += entries.len();
                Some(
                    entries
                        .iter()
                        .map(|entry| self.normalizer.normalize(source, entry))
                        .collect(),
                )
            }
            Err(e) => {
                warn!(source = %source.display_name(), error = %e, "Feed failed; skipping source");
                stats.failed_sources += 1;
                None
            }
        }
    }

    /// Build the full snapshot from every source.
    ///
    /// Relevant articles are summarized when a backend is configured, then
    /// sorted newest first.
    ///
    /// # Returns
    ///
    /// The snapshot document and the run counters. Failing sources are
    /// counted and skipped, never surfaced as errors.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn run_snapshot(&self, keywords: &KeywordSet) -> (IngestResult, RunStats) {
        let mut stats = RunStats::default();
        let mut all = Vec::new();

        for source in &self.sources {
            let Some(articles) = self.collect(source, &mut stats).await else {
                continue;
            };
            let before = all.len();
            for mut article in articles {
                if !is_interesting(&article, keywords) {
                    stats.filtered_out += 1;
                    continue;
                }
                if self.summarizer.is_enabled() {
                    article.summary = self.summarizer.summarize(&article.title, &article.summary).await;
                }
                all.push(article);
            }
            info!(
                source = %source.display_name(),
                kept = all.len() - before,
                "Collected source"
            );
        }

        let result = IngestResult::new(all, Utc::now());
        stats.added = result.total;
        (result, stats)
    }

    /// Insert every relevant, unseen article into `store`.
    ///
    /// Per article: keyword filter, existence check, summarize, insert.
    /// An article that is filtered out or already stored never reaches the
    /// summarizer. Store failures skip the article and the batch continues.
    ///
    /// # Returns
    ///
    /// The run counters; `added` is the number of rows inserted.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn run_incremental<S: ArticleStore>(
        &self,
        store: &S,
        keywords: &KeywordSet,
    ) -> RunStats {
        let mut stats = RunStats::default();

        for source in &self.sources {
            let Some(articles) = self.collect(source, &mut stats).await else {
                continue;
            };
            let added_before = stats.added;
            for article in articles {
                self.ingest_one(store, keywords, article, &mut stats).await;
            }
            info!(
                source = %source.display_name(),
                added = stats.added - added_before,
                "Processed source"
            );
        }
        stats
    }

    async fn ingest_one<S: ArticleStore>(
        &self,
        store: &S,
        keywords: &KeywordSet,
        mut article: Article,
        stats: &mut RunStats,
    ) {
        if !is_interesting(&article, keywords) {
            debug!(title = %article.title, "Not relevant");
            stats.filtered_out += 1;
            return;
        }
        if article.url.is_empty() {
            warn!(title = %article.title, "Entry has no URL; skipping");
            stats.missing_url += 1;
            return;
        }

        match store.exists(&article.url).await {
            Ok(true) => {
                debug!(url = %article.url, "Already stored");
                stats.duplicates += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                error!(url = %article.url, error = %e, "Existence check failed; skipping article");
                stats.store_errors += 1;
                return;
            }
        }

        article.summary = self.summarizer.summarize(&article.title, &article.summary).await;

        match store.insert(&article).await {
            Ok(()) => {
                info!(title = %article.title, url = %article.url, "Added article");
                stats.added += 1;
            }
            Err(e) => {
                error!(url = %article.url, error = %e, "Insert failed");
                stats.store_errors += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedAsk;
    use crate::feeds::testing::StaticFetcher;
    use crate::models::SourceType;
    use crate::store::memory::MemoryStore;

    const FEED_URL: &str = "https://news.example/rss";

    const FEED: &str = r#"<rss version="2.0"><channel>
      <item>
        <title>New AI chip announced</title>
        <link>https://news.example/ai-chip</link>
        <pubDate>Fri, 01 Mar 2024 00:00:00 +0000</pubDate>
        <description>Faster inference.</description>
      </item>
      <item>
        <title>Local weather</title>
        <link>https://news.example/weather</link>
        <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
        <description>Sunny all week.</description>
      </item>
    </channel></rss>"#;

    const SECOND_FEED: &str = r#"<rss version="2.0"><channel>
      <item>
        <title>Undated note</title>
        <link>https://other.example/note</link>
      </item>
      <item>
        <title>Spring preview</title>
        <link>https://other.example/spring</link>
        <pubDate>Sat, 02 Mar 2024 00:00:00 +0000</pubDate>
      </item>
    </channel></rss>"#;

    fn rss(name: &str, url: &str) -> SourceDescriptor {
        SourceDescriptor {
            name: Some(name.to_string()),
            url: url.to_string(),
            category: Some("tech".to_string()),
            kind: SourceType::Rss,
        }
    }

    fn pipeline<'a>(
        fetcher: StaticFetcher,
        sources: Vec<SourceDescriptor>,
        summarizer: Summarizer<&'a ScriptedAsk>,
    ) -> Pipeline<StaticFetcher, &'a ScriptedAsk> {
        Pipeline::new(
            fetcher,
            Normalizer::new(200, &[]),
            summarizer,
            sources,
            10,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_incremental_inserts_only_relevant_article() {
        let backend = ScriptedAsk::default();
        let p = pipeline(
            StaticFetcher::default().with(FEED_URL, FEED),
            vec![rss("News", FEED_URL)],
            Summarizer::new(&backend, "Japanese", 150),
        );
        let store = MemoryStore::default();

        let stats = p.run_incremental(&store, &KeywordSet::new(["AI"])).await;

        assert_eq!(stats.added, 1);
        assert_eq!(stats.filtered_out, 1);
        assert_eq!(store.urls(), vec!["https://news.example/ai-chip"]);
        // The irrelevant entry never reached the store.
        assert_eq!(
            *store.exists_calls.lock().unwrap(),
            vec!["https://news.example/ai-chip".to_string()]
        );
        assert_eq!(backend.calls(), 1);
        assert_eq!(store.rows.lock().unwrap()[0].summary, "summary #1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_incremental_second_run_stores_nothing_new() {
        let backend = ScriptedAsk::default();
        let p = pipeline(
            StaticFetcher::default().with(FEED_URL, FEED),
            vec![rss("News", FEED_URL)],
            Summarizer::new(&backend, "Japanese", 150),
        );
        let store = MemoryStore::default();
        let keywords = KeywordSet::default();

        let first = p.run_incremental(&store, &keywords).await;
        let second = p.run_incremental(&store, &keywords).await;

        assert_eq!(first.added, 2);
        assert_eq!(second.added, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(store.urls().len(), 2);
        // Duplicates are skipped before summarization.
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_incremental_same_url_in_two_feeds_is_stored_once() {
        let duplicate = FEED.replace("https://news.example/weather", "https://news.example/ai-chip");
        let p = pipeline(
            StaticFetcher::default().with(FEED_URL, &duplicate),
            vec![rss("News", FEED_URL)],
            Summarizer::identity(),
        );
        let store = MemoryStore::default();

        let stats = p.run_incremental(&store, &KeywordSet::default()).await;
        assert_eq!(stats.added, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(store.urls(), vec!["https://news.example/ai-chip"]);
    }

    #[tokio::test]
    async fn test_incremental_insert_failure_does_not_stop_batch() {
        let p = pipeline(
            StaticFetcher::default().with(FEED_URL, FEED),
            vec![rss("News", FEED_URL)],
            Summarizer::identity(),
        );
        let store = MemoryStore {
            fail_inserts_for: vec!["https://news.example/ai-chip".to_string()],
            ..Default::default()
        };

        let stats = p.run_incremental(&store, &KeywordSet::default()).await;
        assert_eq!(stats.store_errors, 1);
        assert_eq!(stats.added, 1);
        assert_eq!(store.urls(), vec!["https://news.example/weather"]);
        // Identity summarizer leaves the cleaned feed summary in place.
        assert_eq!(store.rows.lock().unwrap()[0].summary, "Sunny all week.");
    }

    #[tokio::test]
    async fn test_failed_and_non_rss_sources_are_skipped() {
        let mut api = rss("Some API", "https://api.example/items");
        api.kind = SourceType::Other;
        let p = pipeline(
            StaticFetcher::default().with(FEED_URL, FEED),
            vec![rss("Broken", "https://broken.example/rss"), api, rss("News", FEED_URL)],
            Summarizer::identity(),
        );
        let store = MemoryStore::default();

        let stats = p.run_incremental(&store, &KeywordSet::default()).await;
        assert_eq!(stats.sources, 3);
        assert_eq!(stats.failed_sources, 1);
        assert_eq!(stats.skipped_sources, 1);
        assert_eq!(stats.added, 2);
    }

    #[tokio::test]
    async fn test_snapshot_sorts_across_sources() {
        let p = pipeline(
            StaticFetcher::default()
                .with(FEED_URL, FEED)
                .with("https://other.example/rss", SECOND_FEED),
            vec![rss("News", FEED_URL), rss("Other", "https://other.example/rss")],
            Summarizer::identity(),
        );

        let (result, stats) = p.run_snapshot(&KeywordSet::default()).await;
        let urls: Vec<&str> = result.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://other.example/spring",
                "https://news.example/ai-chip",
                "https://news.example/weather",
                "https://other.example/note",
            ]
        );
        assert_eq!(result.total, 4);
        assert_eq!(stats.added, 4);
        assert_eq!(result.articles[0].source, "Other");
    }

    #[tokio::test]
    async fn test_snapshot_with_no_sources_is_empty() {
        let p = pipeline(StaticFetcher::default(), vec![], Summarizer::identity());
        let (result, stats) = p.run_snapshot(&KeywordSet::default()).await;
        assert_eq!(result.total, 0);
        assert!(result.articles.is_empty());
        assert_eq!(stats, RunStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_applies_filter_and_summarizer() {
        let backend = ScriptedAsk::new(vec![Ok("要約".to_string())]);
        let p = pipeline(
            StaticFetcher::default().with(FEED_URL, FEED),
            vec![rss("News", FEED_URL)],
            Summarizer::new(&backend, "Japanese", 150),
        );
        let (result, stats) = p.run_snapshot(&KeywordSet::new(["weather"])).await;
        assert_eq!(result.total, 1);
        assert_eq!(result.articles[0].summary, "要約");
        assert_eq!(stats.filtered_out, 1);
    }

    #[tokio::test]
    async fn test_load_keywords_prefers_remote() {
        let store = MemoryStore {
            settings: Some(vec!["Rust".to_string()]),
            ..Default::default()
        };
        let set = load_keywords(Some(&store), "default", &["AI".to_string()]).await;
        assert_eq!(set.as_slice(), &["Rust".to_string()]);
    }

    #[tokio::test]
    async fn test_load_keywords_falls_back() {
        let fallback = vec!["AI".to_string()];

        let failing = MemoryStore {
            fail_settings: true,
            ..Default::default()
        };
        let set = load_keywords(Some(&failing), "default", &fallback).await;
        assert_eq!(set.as_slice(), fallback.as_slice());

        let absent = MemoryStore::default();
        let set = load_keywords(Some(&absent), "default", &fallback).await;
        assert_eq!(set.as_slice(), fallback.as_slice());

        let set = load_keywords(None::<&MemoryStore>, "default", &fallback).await;
        assert_eq!(set.as_slice(), fallback.as_slice());
    }
}
