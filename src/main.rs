//! # News Digest
//!
//! Pulls articles from a configured list of RSS/Atom feeds, keeps the ones
//! matching a keyword list, optionally rewrites their summaries through an
//! OpenAI-compatible LLM, and persists the result.
//!
//! ## Usage
//!
//! ```sh
//! # Regenerate data/latest.json
//! news_digest -c sources.yml -o data/latest.json
//!
//! # Insert unseen articles into the hosted table store
//! news_digest --mode incremental
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: YAML source list + CLI/env secrets → [`config::RunConfig`]
//! 2. **Keywords**: remote settings record, falling back to the YAML list
//! 3. **Fetching**: download and parse each RSS source in turn
//! 4. **Normalizing**: clean summaries, pick an image, parse the date
//! 5. **Filtering / dedupe / summarizing**: see [`pipeline`]
//! 6. **Output**: JSON snapshot or table store inserts

use clap::Parser;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod feeds;
mod filter;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod store;
mod utils;

#[cfg(test)]
mod http_fixture;

use api::{ChatClient, Summarizer};
use cli::{Cli, PersistMode};
use config::{RunConfig, load_config};
use feeds::HttpFetcher;
use normalize::Normalizer;
use outputs::json;
use pipeline::{Pipeline, RunStats, load_keywords};
use store::RestStore;

const FEED_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    let start_time = Instant::now();

    // Fatal errors are logged and the process still exits normally.
    if let Err(e) = run(args).await {
        error!(error = %e, "Run aborted");
        return;
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
}

async fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    let feeds = load_config(&args.config)?;
    let run = RunConfig::resolve(&args, feeds)?;

    if args.print_config {
        print!("{}", run.render());
        return Ok(());
    }

    info!(mode = ?run.mode, sources = run.feeds.sources.len(), "news_digest starting up");

    let fetcher = HttpFetcher::new(FEED_TIMEOUT)?;
    let normalizer = Normalizer::new(run.feeds.summary_max_len, &run.feeds.boilerplate_markers);
    let summarizer = match &run.ai {
        Some(ai) => {
            info!(model = %ai.model, "Summarization enabled");
            Summarizer::new(ChatClient::new(ai)?, ai.language.clone(), ai.target_chars)
        }
        None => Summarizer::identity(),
    };
    let store = run.store.as_ref().map(RestStore::new).transpose()?;

    let keywords =
        load_keywords(store.as_ref(), &run.feeds.settings_key, &run.feeds.keywords).await;
    if keywords.is_empty() {
        info!("No keywords configured; every article is relevant");
    }

    let pipeline = Pipeline::new(
        fetcher,
        normalizer,
        summarizer,
        run.feeds.sources.clone(),
        run.feeds.max_items_per_source,
    );

    match run.mode {
        PersistMode::Snapshot => {
            let (result, stats) = pipeline.run_snapshot(&keywords).await;
            let path = json::write_snapshot(&result, &run.output_path).await?;
            report(&stats);
            info!(path = %path.display(), total = result.total, "Generated snapshot");
        }
        PersistMode::Incremental => {
            let store = store.ok_or(error::ConfigError::MissingCredential("SUPABASE_URL"))?;
            let stats = pipeline.run_incremental(&store, &keywords).await;
            report(&stats);
            info!(added = stats.added, "Added new articles");
        }
    }
    Ok(())
}

fn report(stats: &RunStats) {
    info!(
        sources = stats.sources,
        skipped_sources = stats.skipped_sources,
        failed_sources = stats.failed_sources,
        fetched = stats.fetched,
        filtered_out = stats.filtered_out,
        missing_url = stats.missing_url,
        duplicates = stats.duplicates,
        added = stats.added,
        store_errors = stats.store_errors,
        "Run summary"
    );
}
