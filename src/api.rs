//! LLM summarization with bounded retry on rate limiting.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for sending one prompt and getting text back
//! - [`ChatClient`]: OpenAI-compatible `/chat/completions` implementation
//! - [`RetryAsk`]: decorator retrying rate-limited calls with linear backoff
//! - [`Summarizer`]: per-article entry point with identity fallback
//!
//! # Retry Strategy
//!
//! - At most 3 attempts, and only rate-limit failures are retried
//! - The wait after attempt `n` is `10s × n` (10s, 20s, 30s)
//! - Any other failure gives up immediately
//! - Every successful summary is followed by a fixed 4s pause

use crate::config::AiSettings;
use crate::error::AskError;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

pub const MAX_ATTEMPTS: u32 = 3;
pub const BACKOFF_STEP: Duration = Duration::from_secs(10);
pub const COOLDOWN: Duration = Duration::from_secs(4);

/// Error body fragments that signal rate limiting when no 429 status is available.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "quota",
    "resource_exhausted",
    "too many requests",
    "429",
];

/// Heuristic for providers that report throttling only in the error text.
pub fn looks_rate_limited(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Trait for async LLM interaction.
///
/// Implemented by the HTTP client, by the [`RetryAsk`] decorator and by
/// the scripted fake used in tests.
pub trait AskAsync {
    /// Send `prompt` and return the model's text.
    ///
    /// # Errors
    ///
    /// [`AskError::RateLimited`] when the provider throttles the call; the
    /// retry decorator keys off this variant.
    async fn ask(&self, prompt: &str) -> Result<String, AskError>;
}

/// Retries rate-limited calls of an inner [`AskAsync`] with linear backoff.
///
/// ```text
/// delay after attempt n = step * n
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_attempts: u32,
    step: Duration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_attempts: u32, step: Duration) -> Self {
        Self {
            inner,
            max_attempts,
            step,
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_attempts", &self.max_attempts)
            .field("step", &self.step)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String, AskError> {
        let total_t0 = Instant::now();
        let mut last_err = AskError::RateLimited("no attempt made".to_string());

        for attempt in 1..=self.max_attempts {
            match self.inner.ask(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_rate_limited() => {
                    let delay = self.step * attempt;
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        ?delay,
                        error = %e,
                        "Rate limited; backing off"
                    );
                    sleep(delay).await;
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        error!(
            max = self.max_attempts,
            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
            "Rate limit retries exhausted"
        );
        Err(last_err)
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completion client.
pub struct ChatClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatClient {
    pub fn new(settings: &AiSettings) -> Result<Self, AskError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

/// Map a failed completion response to an [`AskError`]. A 429 status is
/// authoritative; otherwise the body text is checked for throttling hints.
pub fn classify_failure(status: StatusCode, body: &str) -> AskError {
    if status == StatusCode::TOO_MANY_REQUESTS || looks_rate_limited(body) {
        AskError::RateLimited(truncate_for_log(body, 200))
    } else {
        AskError::Api {
            status: status.as_u16(),
            message: truncate_for_log(body, 300),
        }
    }
}

impl AskAsync for ChatClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String, AskError> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_failure(status, &body);
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %err, "API call failed");
            return Err(err);
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(AskError::EmptyResponse)?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "API call succeeded");
        Ok(content)
    }
}

/// Build the fixed summarization prompt.
pub fn build_prompt(title: &str, text: &str, language: &str, target_chars: usize) -> String {
    format!(
        "Summarize the following news article in {language} in about {target_chars} characters. \
         Reply with the summary only, without a heading or bullet points.\n\n\
         Title: {title}\n\n\
         Article: {text}"
    )
}

/// Per-article summarizer. Without a backend it returns the text unchanged.
pub struct Summarizer<T> {
    backend: Option<RetryAsk<T>>,
    language: String,
    target_chars: usize,
    cooldown: Duration,
}

impl<T> fmt::Debug for Summarizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summarizer")
            .field("enabled", &self.backend.is_some())
            .field("language", &self.language)
            .field("target_chars", &self.target_chars)
            .finish()
    }
}

impl<T> Summarizer<T>
where
    T: AskAsync,
{
    pub fn new(backend: T, language: impl Into<String>, target_chars: usize) -> Self {
        Self {
            backend: Some(RetryAsk::new(backend, MAX_ATTEMPTS, BACKOFF_STEP)),
            language: language.into(),
            target_chars,
            cooldown: COOLDOWN,
        }
    }

    /// A summarizer that never calls out.
    pub fn identity() -> Self {
        Self {
            backend: None,
            language: String::new(),
            target_chars: 0,
            cooldown: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Rewrite `text` through the model.
    ///
    /// # Arguments
    ///
    /// * `title` - Article title, included in the prompt
    /// * `text` - The cleaned feed summary
    ///
    /// # Returns
    ///
    /// The model's summary after a successful call (followed by the
    /// cooldown pause). `text` unchanged when summarization is disabled or
    /// the call fails, exhausted rate-limit retries included.
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(title, 60)))]
    pub async fn summarize(&self, title: &str, text: &str) -> String {
        let Some(backend) = &self.backend else {
            return text.to_string();
        };

        let prompt = build_prompt(title, text, &self.language, self.target_chars);
        match backend.ask(&prompt).await {
            Ok(summary) => {
                info!(chars = summary.chars().count(), "Summarized article");
                sleep(self.cooldown).await;
                summary
            }
            Err(e) if e.is_rate_limited() => {
                warn!(error = %e, "Still rate limited; keeping original summary");
                text.to_string()
            }
            Err(e) => {
                error!(error = %e, "Summarization failed; keeping original summary");
                text.to_string()
            }
        }
    }
}
