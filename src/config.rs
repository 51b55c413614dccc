//! Configuration: the YAML source list plus the run settings derived from
//! CLI flags and environment secrets.
//!
//! Everything is resolved once at startup into a [`RunConfig`] that is
//! handed to the pipeline. Missing store credentials in incremental mode
//! are a [`ConfigError`]; a missing AI key only disables summarization.

use crate::cli::{Cli, PersistMode};
use crate::error::ConfigError;
use crate::models::SourceDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, instrument, warn};
use url::Url;

pub const DEFAULT_MAX_ITEMS: usize = 10;
pub const DEFAULT_SUMMARY_MAX_LEN: usize = 200;

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

fn default_summary_max_len() -> usize {
    DEFAULT_SUMMARY_MAX_LEN
}

fn default_boilerplate_markers() -> Vec<String> {
    ["The post ", "Continue reading", "Read more", "続きを読む"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_language() -> String {
    "Japanese".to_string()
}

fn default_target_chars() -> usize {
    150
}

fn default_settings_key() -> String {
    "default".to_string()
}

/// The YAML configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    pub sources: Vec<SourceDescriptor>,
    /// Static keyword list used when the remote settings record is unavailable.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_max_items")]
    pub max_items_per_source: usize,
    #[serde(default = "default_summary_max_len")]
    pub summary_max_len: usize,
    #[serde(default = "default_boilerplate_markers")]
    pub boilerplate_markers: Vec<String>,
    #[serde(default = "default_language")]
    pub summary_language: String,
    #[serde(default = "default_target_chars")]
    pub summary_target_chars: usize,
    #[serde(default = "default_settings_key")]
    pub settings_key: String,
}

impl FeedConfig {
    /// Parse a configuration document. A document without a `sources`
    /// list is rejected.
    pub fn from_yaml(text: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }
}

/// Read the configuration document at `path`.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> Result<FeedConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    let config = FeedConfig::from_yaml(&text, &display)?;
    info!(
        sources = config.sources.len(),
        keywords = config.keywords.len(),
        "Loaded configuration"
    );
    Ok(config)
}

/// Credentials for the hosted table store.
#[derive(Clone)]
pub struct StoreCredentials {
    pub url: Url,
    pub key: String,
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("url", &self.url.as_str())
            .field("key", &mask(&self.key))
            .finish()
    }
}

/// Settings for the completion API.
#[derive(Clone)]
pub struct AiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub language: String,
    pub target_chars: usize,
}

impl fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSettings")
            .field("api_key", &mask(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("language", &self.language)
            .field("target_chars", &self.target_chars)
            .finish()
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: PersistMode,
    pub feeds: FeedConfig,
    pub output_path: String,
    pub store: Option<StoreCredentials>,
    /// `None` means identity summarization.
    pub ai: Option<AiSettings>,
}

impl RunConfig {
    /// Combine parsed CLI arguments with the configuration document.
    pub fn resolve(cli: &Cli, feeds: FeedConfig) -> Result<Self, ConfigError> {
        let store = store_credentials(cli.store_url.as_deref(), cli.store_key.as_deref())?;
        if cli.mode == PersistMode::Incremental && store.is_none() {
            let missing = if non_empty(cli.store_url.as_deref()).is_none() {
                "SUPABASE_URL"
            } else {
                "SUPABASE_KEY"
            };
            return Err(ConfigError::MissingCredential(missing));
        }

        let ai = match (cli.no_summarize, non_empty(cli.ai_api_key.as_deref())) {
            (true, _) => {
                info!("Summarization disabled by flag");
                None
            }
            (false, None) => {
                warn!("AI_API_KEY is not set; summaries are kept as published");
                None
            }
            (false, Some(key)) => Some(AiSettings {
                api_key: key.to_string(),
                base_url: cli.ai_base_url.trim_end_matches('/').to_string(),
                model: cli.ai_model.clone(),
                language: feeds.summary_language.clone(),
                target_chars: feeds.summary_target_chars,
            }),
        };

        Ok(Self {
            mode: cli.mode,
            feeds,
            output_path: cli.output.clone(),
            store,
            ai,
        })
    }

    /// Human-readable dump with secrets masked, for `--print-config`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("mode: {:?}\n", self.mode));
        out.push_str(&format!("output: {}\n", self.output_path));
        match &self.store {
            Some(s) => out.push_str(&format!("store: {} (key {})\n", s.url, mask(&s.key))),
            None => out.push_str("store: <not configured>\n"),
        }
        match &self.ai {
            Some(ai) => out.push_str(&format!(
                "summarizer: {} via {} (key {}, {} chars, {})\n",
                ai.model,
                ai.base_url,
                mask(&ai.api_key),
                ai.target_chars,
                ai.language
            )),
            None => out.push_str("summarizer: <identity>\n"),
        }
        out.push_str(&format!(
            "max_items_per_source: {}\nsummary_max_len: {}\n",
            self.feeds.max_items_per_source, self.feeds.summary_max_len
        ));
        out.push_str(&format!("keywords (fallback): {:?}\n", self.feeds.keywords));
        out.push_str(&format!("sources ({}):\n", self.feeds.sources.len()));
        for s in &self.feeds.sources {
            out.push_str(&format!(
                "  - {} [{:?}] {} {}\n",
                s.display_name(),
                s.kind,
                s.category.as_deref().unwrap_or("-"),
                s.url
            ));
        }
        out
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn store_credentials(
    url: Option<&str>,
    key: Option<&str>,
) -> Result<Option<StoreCredentials>, ConfigError> {
    match (non_empty(url), non_empty(key)) {
        (Some(url), Some(key)) => {
            let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl {
                field: "SUPABASE_URL",
                value: url.to_string(),
            })?;
            Ok(Some(StoreCredentials {
                url: parsed,
                key: key.to_string(),
            }))
        }
        _ => Ok(None),
    }
}

/// Keep the first four characters of a secret.
pub fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "***".to_string()
    } else {
        format!("{visible}***")
    }
}
