//! Turning parsed feed entries into [`Article`]s.
//!
//! Summary cleaning runs in a fixed order:
//!
//! 1. strip HTML tags
//! 2. decode HTML entities
//! 3. cut everything from the first boilerplate marker (case-insensitive)
//! 4. collapse whitespace
//! 5. hard-truncate to `max_len` characters, appending `…` when cut
//!
//! Image extraction tries, first match wins: image `media:content`, the
//! first `media:thumbnail`, an image enclosure, then the first `<img src>`
//! in the raw summary or content HTML.

use crate::models::{Article, RawEntry, SourceDescriptor};
use crate::utils::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::warn;

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src\s*=\s*["']([^"']+)["']"#).unwrap());

/// Summary cleaner configured with a length cap and boilerplate markers.
#[derive(Debug, Clone)]
pub struct Normalizer {
    max_len: usize,
    markers: Vec<Regex>,
}

impl Normalizer {
    pub fn new(max_len: usize, markers: &[String]) -> Self {
        let markers = markers
            .iter()
            .filter(|m| !m.is_empty())
            .filter_map(|m| match Regex::new(&format!("(?i){}", regex::escape(m))) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(marker = %m, error = %e, "Ignoring boilerplate marker");
                    None
                }
            })
            .collect();
        Self { max_len, markers }
    }

    /// Build an [`Article`] for `entry` published by `source`.
    ///
    /// The summary comes from the entry's summary, else its content, and
    /// goes through [`Normalizer::clean_summary`]. Title and URL are
    /// trimmed; an empty category becomes `None`.
    pub fn normalize(&self, source: &SourceDescriptor, entry: &RawEntry) -> Article {
        let raw_summary = entry
            .summary
            .as_deref()
            .or(entry.content.as_deref())
            .unwrap_or("");

        Article {
            source: source.display_name().to_string(),
            category: source
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
            title: entry.title.trim().to_string(),
            url: entry.link.trim().to_string(),
            image_url: extract_image(entry),
            published_at: entry.published,
            summary: self.clean_summary(raw_summary),
        }
    }

    pub fn clean_summary(&self, raw: &str) -> String {
        let text = strip_tags(raw);
        let mut text = html_escape::decode_html_entities(&text).into_owned();

        let cut = self
            .markers
            .iter()
            .filter_map(|re| re.find(&text).map(|m| m.start()))
            .min();
        if let Some(at) = cut {
            text.truncate(at);
        }

        let text = RE_WS.replace_all(text.trim(), " ");
        truncate_chars(&text, self.max_len)
    }
}

/// Drop markup and keep text nodes, separated by spaces.
///
/// Every input goes through the HTML parser, so character references are
/// resolved once here whether or not the text carries any tags.
pub fn strip_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect::<Vec<_>>().join(" ")
}

fn is_image_type(mime: Option<&str>) -> bool {
    mime.is_some_and(|t| t.to_ascii_lowercase().starts_with("image"))
}

/// Pick a representative image URL for an entry.
pub fn extract_image(entry: &RawEntry) -> Option<String> {
    let from_media = entry.media_content.iter().find(|m| {
        is_image_type(m.mime_type.as_deref())
            || m.medium.as_deref().is_some_and(|x| x.eq_ignore_ascii_case("image"))
    });
    if let Some(m) = from_media {
        return Some(m.url.clone());
    }

    if let Some(thumb) = entry.media_thumbnails.first() {
        return Some(thumb.clone());
    }

    if let Some(enc) = entry
        .enclosures
        .iter()
        .find(|e| is_image_type(e.mime_type.as_deref()))
    {
        return Some(enc.url.clone());
    }

    [entry.summary.as_deref(), entry.content.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|html| RE_IMG.captures(html))
        .map(|caps| html_escape::decode_html_entities(&caps[1]).into_owned())
}
