//! Feed document parsing on top of `feed-rs`.
//!
//! `feed-rs` reads RSS 0.9x/1.0/2.0, Atom and JSON Feed and resolves
//! extension elements by namespace URI, so `<m:content>` bound to the Media
//! RSS namespace is seen the same as `<media:content>`. This module only
//! maps its model onto [`RawEntry`]:
//!
//! | `RawEntry` field   | Taken from                                             |
//! |--------------------|--------------------------------------------------------|
//! | `link`             | first `alternate` (or rel-less) link, else first link  |
//! | `published`        | `published`, falling back to `updated`                 |
//! | `summary`          | `description` / `summary`                              |
//! | `content`          | `content:encoded` / Atom `content` body                |
//! | `media_content`    | `media:content` and RSS `<enclosure>`                  |
//! | `media_thumbnails` | `media:thumbnail`                                      |
//! | `enclosures`       | Atom `<link rel="enclosure">`                          |

use crate::error::FetchError;
use crate::models::{Enclosure, MediaContent, RawEntry};
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use tracing::debug;

fn rel_is(link: &Link, rel: &str) -> bool {
    link.rel.as_deref().is_some_and(|r| r.eq_ignore_ascii_case(rel))
}

/// The article link of an entry: an `alternate` or rel-less link first,
/// then anything that is not `self` or an enclosure.
fn select_link(entry: &Entry) -> String {
    let usable = || entry.links.iter().filter(|l| !l.href.trim().is_empty());
    usable()
        .find(|l| l.rel.is_none() || rel_is(l, "alternate"))
        .or_else(|| usable().find(|l| !rel_is(l, "self") && !rel_is(l, "enclosure")))
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default()
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

fn raw_entry(entry: Entry) -> RawEntry {
    let link = select_link(&entry);

    let enclosures = entry
        .links
        .iter()
        .filter(|l| rel_is(l, "enclosure") && !l.href.trim().is_empty())
        .map(|l| Enclosure {
            url: l.href.trim().to_string(),
            mime_type: l.media_type.clone(),
        })
        .collect();

    let mut media_content = Vec::new();
    let mut media_thumbnails = Vec::new();
    for media in &entry.media {
        for content in &media.content {
            let Some(url) = content.url.as_ref() else {
                continue;
            };
            media_content.push(MediaContent {
                url: url.to_string(),
                mime_type: content.content_type.as_ref().map(|m| m.to_string()),
                medium: content.content_type.as_ref().map(|m| m.ty().as_str().to_string()),
            });
        }
        media_thumbnails.extend(media.thumbnails.iter().map(|t| t.image.uri.clone()));
    }

    RawEntry {
        title: entry
            .title
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default(),
        link,
        published: entry.published.or(entry.updated),
        summary: entry.summary.map(|t| t.content).and_then(non_blank),
        content: entry.content.and_then(|c| c.body).and_then(non_blank),
        media_content,
        media_thumbnails,
        enclosures,
    }
}

/// Parse a feed document.
///
/// # Arguments
///
/// * `xml` - The feed body as downloaded
/// * `max_items` - Hard cap on the number of entries returned
///
/// # Returns
///
/// At most `max_items` entries in document order.
///
/// # Errors
///
/// [`FetchError::Parse`] when the body is not well-formed or is not a
/// recognized feed format.
pub fn parse_feed(xml: &str, max_items: usize) -> Result<Vec<RawEntry>, FetchError> {
    let feed = parser::parse(xml.as_bytes())?;
    let total = feed.entries.len();
    let entries: Vec<RawEntry> = feed
        .entries
        .into_iter()
        .take(max_items)
        .map(raw_entry)
        .collect();
    debug!(total, kept = entries.len(), "Parsed feed");
    Ok(entries)
}
