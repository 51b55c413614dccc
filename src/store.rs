//! Hosted table store used in incremental mode.
//!
//! Two tables are involved:
//!
//! | Table      | Key   | Use                                   |
//! |------------|-------|---------------------------------------|
//! | `articles` | `url` | existence check, insert               |
//! | `settings` | `key` | read-only lookup of `value.keywords`  |
//!
//! [`RestStore`] talks to a PostgREST endpoint (as exposed by Supabase)
//! under `<base>/rest/v1/`. Each call is a single blocking round trip;
//! there is no batching.

use crate::config::StoreCredentials;
use crate::error::StoreError;
use crate::models::Article;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Persistence seam for incremental mode.
///
/// Implementors only need single-row operations. The pipeline guarantees
/// that `insert` is called only after `exists` returned `false` for the
/// same URL within the run.
pub trait ArticleStore {
    /// Whether an article with exactly this URL is already stored.
    ///
    /// # Arguments
    ///
    /// * `url` - The article URL, compared case-sensitively
    async fn exists(&self, url: &str) -> Result<bool, StoreError>;

    /// Append one article row.
    ///
    /// # Errors
    ///
    /// Any rejection by the store (including a unique-key conflict) is a
    /// [`StoreError`]; the caller logs it and moves on.
    async fn insert(&self, article: &Article) -> Result<(), StoreError>;

    /// The `keywords` list of the settings record `key`. `Ok(None)` when the
    /// record or the list is absent.
    async fn keywords(&self, key: &str) -> Result<Option<Vec<String>>, StoreError>;
}

#[derive(Deserialize)]
struct SettingsRow {
    value: serde_json::Value,
}

/// [`ArticleStore`] over PostgREST.
pub struct RestStore {
    http: Client,
    rest_base: Url,
    key: String,
}

impl fmt::Debug for RestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStore")
            .field("rest_base", &self.rest_base.as_str())
            .finish()
    }
}

impl RestStore {
    /// Build a client for `<credentials.url>/rest/v1/`.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidUrl`] when the REST base cannot be derived from
    /// the configured URL.
    pub fn new(credentials: &StoreCredentials) -> Result<Self, StoreError> {
        let mut base = credentials.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_base = base
            .join("rest/v1/")
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {e}", credentials.url)))?;
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            rest_base,
            key: credentials.key.clone(),
        })
    }

    fn table_url(&self, table: &str, filter: &str) -> String {
        format!("{}{}?{}", self.rest_base, table, filter)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            message: crate::utils::truncate_for_log(&message, 300),
        })
    }
}

/// PostgREST `eq` filter with the value percent-encoded.
pub fn eq_filter(column: &str, value: &str) -> String {
    format!("{column}=eq.{}", urlencoding::encode(value))
}

/// Pull `keywords` out of a settings `value` document.
pub fn keywords_from_value(value: &serde_json::Value) -> Option<Vec<String>> {
    let list = value.get("keywords")?.as_array()?;
    Some(
        list.iter()
            .filter_map(|k| k.as_str().map(String::from))
            .collect(),
    )
}

impl ArticleStore for RestStore {
    #[instrument(level = "debug", skip(self))]
    async fn exists(&self, url: &str) -> Result<bool, StoreError> {
        let endpoint = self.table_url(
            "articles",
            &format!("select=url&{}&limit=1", eq_filter("url", url)),
        );
        let response = self.authorized(self.http.get(&endpoint)).send().await?;
        let rows: Vec<serde_json::Value> = Self::check(response).await?.json().await?;
        debug!(found = !rows.is_empty(), "Existence check");
        Ok(!rows.is_empty())
    }

    #[instrument(level = "debug", skip_all, fields(url = %article.url))]
    async fn insert(&self, article: &Article) -> Result<(), StoreError> {
        let endpoint = format!("{}articles", self.rest_base);
        let response = self
            .authorized(self.http.post(&endpoint))
            .header("Prefer", "return=minimal")
            .json(article)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn keywords(&self, key: &str) -> Result<Option<Vec<String>>, StoreError> {
        let endpoint = self.table_url(
            "settings",
            &format!("select=value&{}&limit=1", eq_filter("key", key)),
        );
        let response = self.authorized(self.http.get(&endpoint)).send().await?;
        let rows: Vec<SettingsRow> = Self::check(response).await?.json().await?;
        Ok(rows.first().and_then(|row| keywords_from_value(&row.value)))
    }
}
