//! Release types for Feedwatch.
//!
//! A release is one show/title on the upstream site. Each feed item
//! announces one downloadable variant of a release; several items may
//! share the same release identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ReleaseId;

/// Descriptive metadata of a release, used when rendering captions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMeta {
    /// Localized title.
    pub title: String,

    /// Original (romanized or native) title.
    pub original_title: String,

    /// Free-form description, possibly containing simple markup.
    #[serde(default)]
    pub description: String,

    /// Banner image reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,

    /// Canonical link of the release page.
    pub link: String,
}

/// One downloadable rendition of a release (a.k.a. torrent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Series label, e.g. `1-12`.
    pub series: String,

    /// Type label encoding quality/format, e.g. `WEBRip 1080p`.
    pub type_label: String,

    /// Declared size in bytes.
    pub size_bytes: u64,

    /// When this variant was published.
    pub published_at: DateTime<Utc>,

    /// Direct download URL.
    pub download_url: String,

    /// Upstream category, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Opaque upstream identifier, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
}

/// A single parsed feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Identifier derived from the item's link.
    pub id: ReleaseId,

    /// Publish instant of the item.
    pub published_at: DateTime<Utc>,

    /// Release metadata carried by the item.
    pub meta: ReleaseMeta,

    /// The variant this item announces.
    pub variant: Variant,
}

impl FeedEntry {
    /// Publish instant as epoch milliseconds.
    pub fn timestamp_millis(&self) -> i64 {
        self.published_at.timestamp_millis()
    }
}

/// All variants of one release seen in a single feed pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release identifier.
    pub id: ReleaseId,

    /// Metadata from the newest entry of this release.
    pub meta: ReleaseMeta,

    /// Variants ordered by publish time (oldest first).
    pub variants: Vec<Variant>,

    /// Maximum publish timestamp across the release's entries (epoch ms).
    pub updated_at: i64,
}
