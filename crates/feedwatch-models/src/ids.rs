//! Type-safe identifier wrappers for Feedwatch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a release, derived from its canonical link.
///
/// Serialized transparently so it can be used as a JSON object key in the
/// baseline file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Creates an ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Derives the identifier from a release link.
    ///
    /// Takes the last non-empty path segment, ignoring any query string or
    /// fragment, and drops a trailing `.html`. Returns `None` when the link
    /// has no usable segment.
    pub fn from_link(link: &str) -> Option<Self> {
        let without_fragment = link.split('#').next().unwrap_or(link);
        let path = without_fragment.split('?').next().unwrap_or(without_fragment);
        let path = path
            .split_once("://")
            .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
            .unwrap_or(path);

        let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
        let segment = segment.strip_suffix(".html").unwrap_or(segment);
        if segment.is_empty() {
            return None;
        }
        Some(Self(segment.to_string()))
    }

    /// Returns the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ReleaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReleaseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ReleaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_link_trailing_segment() {
        let id = ReleaseId::from_link("https://example.org/release/show-a.html").unwrap();
        assert_eq!(id.as_str(), "show-a");
    }

    #[test]
    fn test_from_link_trailing_slash_and_query() {
        let id = ReleaseId::from_link("https://example.org/release/show-b/?utm=rss#top").unwrap();
        assert_eq!(id.as_str(), "show-b");
    }

    #[test]
    fn test_from_link_without_path() {
        assert!(ReleaseId::from_link("https://example.org/").is_none());
        assert!(ReleaseId::from_link("https://example.org").is_none());
        assert!(ReleaseId::from_link("").is_none());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ReleaseId::from("show-a");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"show-a\"");
    }
}
