//! Keyword relevance filter.
//!
//! Plain case-insensitive substring matching over the title and summary.
//! No stemming and no tokenization: "AI" matches "FAIR" as well. An empty
//! keyword set accepts every article.

use crate::models::Article;
use itertools::Itertools;

/// Ordered, case-insensitive keyword list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordSet {
    /// Build a set, trimming entries and dropping blanks and
    /// case-insensitive duplicates (first spelling wins).
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .unique_by(|k| k.to_lowercase())
            .collect();
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();
        Self { keywords, lowered }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    /// True iff some keyword occurs in `text`, ignoring case.
    pub fn matches(&self, text: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let haystack = text.to_lowercase();
        self.lowered.iter().any(|k| haystack.contains(k.as_str()))
    }
}

/// Whether `article` is worth keeping under `keywords`.
///
/// The haystack is the title immediately followed by the summary, with no
/// separator, so a keyword may match across the join.
///
/// # Arguments
///
/// * `article` - The normalized article
/// * `keywords` - The run's keyword set; empty accepts everything
pub fn is_interesting(article: &Article, keywords: &KeywordSet) -> bool {
    keywords.matches(&format!("{}{}", article.title, article.summary))
}
