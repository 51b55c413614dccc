//! Command-line interface definitions for News Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets and most options can also be provided via environment variables.

use clap::{Parser, ValueEnum};

/// Where a run persists its articles.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistMode {
    /// Rewrite one JSON snapshot with everything fetched this run.
    Snapshot,
    /// Insert unseen articles into the hosted `articles` table.
    Incremental,
}

/// Command-line arguments for the News Digest application.
///
/// # Examples
///
/// ```sh
/// # Regenerate data/latest.json from sources.yml
/// news_digest
///
/// # Insert new articles into the table store, summarizing each one
/// SUPABASE_URL=... SUPABASE_KEY=... AI_API_KEY=... news_digest --mode incremental
///
/// # Show the resolved configuration and exit
/// news_digest --print-config
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML source list
    #[arg(short, long, env = "DIGEST_CONFIG", default_value = "sources.yml")]
    pub config: String,

    /// Persistence backend
    #[arg(short, long, value_enum, env = "DIGEST_MODE", default_value_t = PersistMode::Snapshot)]
    pub mode: PersistMode,

    /// Snapshot output file (snapshot mode only)
    #[arg(short, long, env = "DIGEST_OUTPUT", default_value = "data/latest.json")]
    pub output: String,

    /// Keep published summaries even when an AI key is configured
    #[arg(long)]
    pub no_summarize: bool,

    /// Print the resolved configuration and exit without fetching
    #[arg(long)]
    pub print_config: bool,

    /// Table store base URL
    #[arg(long, env = "SUPABASE_URL", hide_env_values = true)]
    pub store_url: Option<String>,

    /// Table store API key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub store_key: Option<String>,

    /// API key for the OpenAI-compatible completion endpoint
    #[arg(long, env = "AI_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible completion endpoint
    #[arg(long, env = "AI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub ai_base_url: String,

    /// Model used for summaries
    #[arg(long, env = "AI_MODEL", default_value = "gpt-4o-mini")]
    pub ai_model: String,
}
