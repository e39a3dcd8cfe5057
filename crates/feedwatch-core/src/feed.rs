//! Feed ingestion: fetch the RSS document and normalize its items.
//!
//! Each `<item>` announces one variant of a release. Its title encodes the
//! release names and the variant descriptor:
//!
//! ```text
//! Localized Title / Original Title [1-12] [WEBRip 1080p]
//! ```
//!
//! The release identifier is the trailing path segment of `<link>`. Vendor
//! extension elements (`contentLength`, `infoHash`, media `thumbnail`) are
//! matched by local name so the namespace prefixes used upstream don't
//! matter.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use feedwatch_models::{FeedEntry, Release, ReleaseId, ReleaseMeta, Variant};
use regex::Regex;
use roxmltree::Node;
use thiserror::Error;
use tracing::{debug, info};

use crate::fetch::{FetchError, PageFetcher};

/// Errors raised while ingesting the feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed could not be downloaded.
    #[error("failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),

    /// The document is not well-formed XML.
    #[error("feed is not valid XML: {0}")]
    InvalidDocument(String),

    /// An item does not have the expected structure. Aborts the whole run.
    #[error("feed item #{index} is malformed: {reason}")]
    Parse { index: usize, reason: String },
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^\s*(?P<title>.+?)\s+/\s+(?P<original>.+?)\s+\[(?P<series>[^\]]+)\]\s*\[(?P<kind>[^\]]+)\]\s*$",
        )
        .expect("title pattern is valid")
    })
}

/// The decoded title of a feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTitle {
    pub title: String,
    pub original_title: String,
    pub series: String,
    pub type_label: String,
}

/// Splits a feed item title into its encoded fields.
pub fn parse_item_title(raw: &str) -> Option<ItemTitle> {
    let caps = title_pattern().captures(raw)?;
    Some(ItemTitle {
        title: caps["title"].trim().to_string(),
        original_title: caps["original"].trim().to_string(),
        series: caps["series"].trim().to_string(),
        type_label: caps["kind"].trim().to_string(),
    })
}

/// Parses a feed publish date (RFC 2822, with RFC 3339 accepted as well).
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Concatenated text of the first child element named `name`.
fn child_text(item: Node<'_, '_>, name: &str) -> Option<String> {
    let child = item.children().find(|n| n.is_element() && n.has_tag_name(name))?;
    let text: String = child
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn child_attr(item: Node<'_, '_>, name: &str, attr: &str) -> Option<String> {
    item.children()
        .find(|n| n.is_element() && n.has_tag_name(name))
        .and_then(|n| n.attribute(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_item(index: usize, item: Node<'_, '_>) -> Result<FeedEntry> {
    let malformed = |reason: String| FeedError::Parse { index, reason };

    let raw_title =
        child_text(item, "title").ok_or_else(|| malformed("missing <title>".to_string()))?;
    let title = parse_item_title(&raw_title)
        .ok_or_else(|| malformed(format!("title does not match pattern: {:?}", raw_title)))?;

    let link = child_text(item, "link").ok_or_else(|| malformed("missing <link>".to_string()))?;
    let id = ReleaseId::from_link(&link)
        .ok_or_else(|| malformed(format!("cannot derive identifier from link {:?}", link)))?;

    let raw_date =
        child_text(item, "pubDate").ok_or_else(|| malformed("missing <pubDate>".to_string()))?;
    let published_at = parse_pub_date(&raw_date)
        .ok_or_else(|| malformed(format!("unparseable <pubDate> {:?}", raw_date)))?;

    let download_url = child_attr(item, "enclosure", "url")
        .ok_or_else(|| malformed("missing <enclosure url>".to_string()))?;

    let size_bytes = child_text(item, "contentLength")
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| child_attr(item, "enclosure", "length").and_then(|v| v.parse().ok()))
        .ok_or_else(|| malformed("missing content length".to_string()))?;

    let meta = ReleaseMeta {
        title: title.title,
        original_title: title.original_title,
        description: child_text(item, "description").unwrap_or_default(),
        banner: child_attr(item, "thumbnail", "url"),
        link,
    };

    let variant = Variant {
        series: title.series,
        type_label: title.type_label,
        size_bytes,
        published_at,
        download_url,
        category: child_text(item, "category"),
        info_hash: child_text(item, "infoHash"),
    };

    Ok(FeedEntry {
        id,
        published_at,
        meta,
        variant,
    })
}

/// Parses every `<item>` of an RSS document.
///
/// A single malformed item fails the whole document; partial data would
/// corrupt the diff against the baseline.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| FeedError::InvalidDocument(e.to_string()))?;

    doc.descendants()
        .filter(|n| n.is_element() && n.has_tag_name("item"))
        .enumerate()
        .map(|(index, item)| parse_item(index, item))
        .collect()
}

/// The normalized result of one feed pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestedFeed {
    /// Identifier to the maximum publish timestamp seen in this pull.
    pub timestamps: BTreeMap<ReleaseId, i64>,
    /// Identifier to release metadata and all of its variants.
    pub releases: BTreeMap<ReleaseId, Release>,
}

impl IngestedFeed {
    /// Collapses entries per identifier, keeping the maximum timestamp.
    pub fn from_entries(entries: Vec<FeedEntry>) -> Self {
        let mut releases: BTreeMap<ReleaseId, Release> = BTreeMap::new();

        for entry in entries {
            let ts = entry.timestamp_millis();
            match releases.get_mut(&entry.id) {
                Some(release) => {
                    if ts > release.updated_at {
                        release.updated_at = ts;
                        release.meta = entry.meta;
                    }
                    release.variants.push(entry.variant);
                }
                None => {
                    releases.insert(
                        entry.id.clone(),
                        Release {
                            id: entry.id,
                            meta: entry.meta,
                            variants: vec![entry.variant],
                            updated_at: ts,
                        },
                    );
                }
            }
        }

        for release in releases.values_mut() {
            release
                .variants
                .sort_by(|a, b| a.published_at.cmp(&b.published_at).then_with(|| a.series.cmp(&b.series)));
        }

        let timestamps = releases
            .iter()
            .map(|(id, release)| (id.clone(), release.updated_at))
            .collect();

        Self {
            timestamps,
            releases,
        }
    }
}

/// Fetches and normalizes the feed.
#[derive(Clone)]
pub struct FeedIngester {
    fetcher: Arc<dyn PageFetcher>,
    feed_url: String,
}

impl FeedIngester {
    pub fn new(fetcher: Arc<dyn PageFetcher>, feed_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            feed_url: feed_url.into(),
        }
    }

    /// Pulls the feed once.
    pub async fn ingest(&self) -> Result<IngestedFeed> {
        let xml = self.fetcher.fetch_text(&self.feed_url).await?;
        let entries = parse_feed(&xml)?;
        debug!(items = entries.len(), "Parsed feed items");

        let feed = IngestedFeed::from_entries(entries);
        info!(releases = feed.timestamps.len(), "Ingested feed");
        Ok(feed)
    }
}
