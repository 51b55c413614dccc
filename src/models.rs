//! Data models shared by the feed layer, the pipeline and the output writers.
//!
//! - [`SourceDescriptor`]: one configured feed
//! - [`RawEntry`]: a feed entry as parsed, before any cleanup
//! - [`Article`]: the normalized record that is filtered, summarized and persisted
//! - [`IngestResult`]: the snapshot document written in snapshot mode
//!
//! An article's identity is its `url`: two articles are the same logical
//! entity iff their trimmed URLs are equal (case-sensitive).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a configured source. Only RSS (which also covers Atom) is fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    /// Anything else, including a missing `type` key. Recognized but skipped.
    #[default]
    #[serde(other)]
    Other,
}

/// A feed entry from the configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceDescriptor {
    /// Display name. Falls back to the URL when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: SourceType,
}

impl SourceDescriptor {
    /// The name articles from this source are attributed to.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.url)
    }

    pub fn is_rss(&self) -> bool {
        self.kind == SourceType::Rss
    }
}

/// A `media:content` element (or an RSS `<enclosure>`, which the feed
/// parser reports the same way). `medium` is the top-level MIME type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaContent {
    pub url: String,
    pub mime_type: Option<String>,
    pub medium: Option<String>,
}

/// An RSS `<enclosure>` or Atom `<link rel="enclosure">`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: Option<String>,
}

/// A feed entry as the parser found it. Text fields have XML escaping
/// resolved but still carry whatever HTML the publisher put in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    /// `published`, or `updated` when the feed only carries that.
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub media_content: Vec<MediaContent>,
    pub media_thumbnails: Vec<String>,
    pub enclosures: Vec<Enclosure>,
}

/// A normalized article. Only `summary` changes after normalization
/// (when the summarizer rewrites it), and nothing changes after persistence.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    pub source: String,
    pub category: Option<String>,
    pub title: String,
    pub url: String,
    pub image_url: Option<String>,
    /// Publication instant in UTC.
    pub published_at: Option<DateTime<Utc>>,
    pub summary: String,
}

/// The document written in snapshot mode.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IngestResult {
    /// UTC generation time, RFC 3339 with a `Z` suffix.
    pub generated_at: String,
    pub total: usize,
    pub articles: Vec<Article>,
}

impl IngestResult {
    /// Sort `articles` newest first (undated last, stable) and wrap them.
    pub fn new(mut articles: Vec<Article>, generated_at: DateTime<Utc>) -> Self {
        sort_newest_first(&mut articles);
        Self {
            generated_at: generated_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            total: articles.len(),
            articles,
        }
    }
}

/// Order by `published_at` descending. Articles without a timestamp go
/// last; equal keys keep their relative order.
pub fn sort_newest_first(articles: &mut [Article]) {
    // `None < Some(_)`, so comparing b to a puts undated entries at the end.
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, published_at: Option<&str>) -> Article {
        Article {
            source: "Example".to_string(),
            category: None,
            title: url.to_string(),
            url: url.to_string(),
            image_url: None,
            published_at: published_at
                .map(|s| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)),
            summary: String::new(),
        }
    }

    #[test]
    fn test_source_type_parsing() {
        let yaml = "name: A\nurl: https://a.example/rss\ntype: rss\n";
        let src: SourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert!(src.is_rss());

        let yaml = "url: https://a.example/api\ntype: scraper\n";
        let src: SourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(src.kind, SourceType::Other);

        let yaml = "url: https://a.example/rss\n";
        let src: SourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(src.kind, SourceType::Other);
    }

    #[test]
    fn test_display_name_falls_back_to_url() {
        let src = SourceDescriptor {
            name: None,
            url: "https://a.example/rss".to_string(),
            category: None,
            kind: SourceType::Rss,
        };
        assert_eq!(src.display_name(), "https://a.example/rss");

        let named = SourceDescriptor {
            name: Some("Example".to_string()),
            ..src
        };
        assert_eq!(named.display_name(), "Example");
    }

    #[test]
    fn test_sort_newest_first_nulls_last() {
        let mut articles = vec![
            article("a", None),
            article("b", Some("2024-01-01T00:00:00+00:00")),
            article("c", Some("2024-03-01T00:00:00+00:00")),
        ];
        sort_newest_first(&mut articles);
        let order: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_and_missing_keys() {
        let mut articles = vec![
            article("x", None),
            article("p", Some("2024-01-01T00:00:00+00:00")),
            article("y", None),
            article("q", Some("2024-01-01T00:00:00+00:00")),
        ];
        sort_newest_first(&mut articles);
        let order: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(order, vec!["p", "q", "x", "y"]);
    }

    #[test]
    fn test_sort_compares_instants_across_offsets() {
        let mut articles = vec![
            article("tokyo", Some("2024-01-01T08:00:00+09:00")),
            article("utc", Some("2024-01-01T00:30:00+00:00")),
        ];
        sort_newest_first(&mut articles);
        assert_eq!(articles[0].url, "utc");
    }

    #[test]
    fn test_ingest_result_empty() {
        let result = IngestResult::new(vec![], Utc::now());
        assert_eq!(result.total, 0);
        assert!(result.articles.is_empty());
        assert!(result.generated_at.ends_with('Z'));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["total"], 0);
        assert_eq!(json["articles"], serde_json::json!([]));
    }

    #[test]
    fn test_article_serializes_all_fields() {
        let a = article("https://a.example/1", Some("2024-03-01T00:00:00+00:00"));
        let json = serde_json::to_value(&a).unwrap();
        for key in [
            "source",
            "category",
            "title",
            "url",
            "image_url",
            "published_at",
            "summary",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        // UTC timestamps serialize with a `Z` suffix.
        assert_eq!(json["published_at"], "2024-03-01T00:00:00Z");
    }

    #[test]
    fn test_article_serializes_published_at_in_utc() {
        let a = article("https://a.example/1", Some("2024-03-01T09:00:00+09:00"));
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["published_at"], "2024-03-01T00:00:00Z");
    }
}
