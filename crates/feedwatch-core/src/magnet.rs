//! On-demand magnet resolution.
//!
//! Captions do not embed magnet URIs directly; they link to the redirect
//! endpoint with the release identifier and the variant's type label. When
//! the link is opened, the release detail page is fetched and scanned for a
//! table row mentioning that type label, and the first `magnet:` URI in that
//! row becomes the redirect target.
//!
//! The scan is a text pattern over the raw page, not an HTML parse. If the
//! upstream markup changes shape, resolution fails with
//! [`ResolveError::NotFound`]; there is nothing structural to fall back on.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::caption::escape_html;
use crate::config::ID_PLACEHOLDER;
use crate::fetch::{FetchError, PageFetcher};

/// Path prefix of the redirect endpoint.
pub const DEFAULT_MAGNET_PREFIX: &str = "/magnet";

/// Errors raised while resolving a magnet link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The detail page could not be fetched.
    #[error("failed to fetch detail page for {id}: {source}")]
    Fetch {
        id: String,
        #[source]
        source: FetchError,
    },

    /// The identifier would escape its path segment in the detail URL.
    #[error("invalid release identifier {id:?}")]
    InvalidId { id: String },

    /// No row with the requested type label carries a magnet URI.
    #[error("no magnet for {id} with type {type_label:?}")]
    NotFound { id: String, type_label: String },
}

/// Builds redirect-endpoint links for the caption renderer.
///
/// Path segments are percent-encoded (a space becomes `%20`), which is the
/// encoding the HTTP router decodes on the receiving side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLinks {
    base: Url,
}

impl MagnetLinks {
    /// `public_url` is the server's external base, `prefix` the endpoint path.
    pub fn new(public_url: &str, prefix: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(public_url)?;
        if base.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        if let Ok(mut segments) = base.path_segments_mut() {
            segments.pop_if_empty();
            for segment in prefix.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        Ok(Self { base })
    }

    /// Link resolving the magnet of `id`'s variant labelled `type_label`.
    pub fn link(&self, id: &str, type_label: &str) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id).push(type_label);
        }
        url.to_string()
    }
}

/// Finds a magnet URI for a type label inside a detail page.
pub trait MagnetExtractor: Send + Sync {
    fn find_magnet(&self, page: &str, type_label: &str) -> Option<String>;
}

fn row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<tr\b.*?</tr>").expect("row pattern is valid"))
}

fn magnet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"magnet:\?[^"'<>\s]+"#).expect("magnet pattern is valid"))
}

/// Scans `<tr>...</tr>` rows for the type label.
///
/// The label is matched either literally or HTML-escaped, since the feed
/// delivers `WEB & TV` where the page markup holds `WEB &amp; TV`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowPatternExtractor;

impl MagnetExtractor for RowPatternExtractor {
    fn find_magnet(&self, page: &str, type_label: &str) -> Option<String> {
        let escaped = escape_html(type_label);
        row_pattern()
            .find_iter(page)
            .map(|row| row.as_str())
            .filter(|row| row.contains(type_label) || row.contains(escaped.as_str()))
            .find_map(|row| magnet_pattern().find(row))
            .map(|m| m.as_str().replace("&amp;", "&"))
    }
}

/// Resolves `(identifier, type label)` to a magnet URI. Stateless per call.
#[derive(Clone)]
pub struct MagnetResolver {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn MagnetExtractor>,
    detail_url_template: String,
}

impl MagnetResolver {
    /// `detail_url_template` must contain `{id}`.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn MagnetExtractor>,
        detail_url_template: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            detail_url_template: detail_url_template.into(),
        }
    }

    /// Detail page URL of `id`.
    ///
    /// `id` arrives percent-decoded from the request path. Identifiers that
    /// could leave their path segment (separators, query, fragment, dot
    /// segments) are rejected. A `%` is kept as is, so identifiers taken from
    /// already-encoded feed links resolve to the same URL.
    pub fn detail_url(&self, id: &str) -> Result<String, ResolveError> {
        let escapes_segment = id.is_empty()
            || id == "."
            || id == ".."
            || id.chars().any(|c| matches!(c, '/' | '\\' | '?' | '#') || c.is_control());
        if escapes_segment {
            warn!(id = %id, "Rejected release identifier");
            return Err(ResolveError::InvalidId { id: id.to_string() });
        }
        Ok(self.detail_url_template.replace(ID_PLACEHOLDER, id))
    }

    pub async fn resolve(&self, id: &str, type_label: &str) -> Result<String, ResolveError> {
        let url = self.detail_url(id)?;

        let page = self.fetcher.fetch_text(&url).await.map_err(|source| {
            warn!(id = %id, url = %url, error = %source, "Failed to fetch detail page");
            ResolveError::Fetch {
                id: id.to_string(),
                source,
            }
        })?;

        match self.extractor.find_magnet(&page, type_label) {
            Some(magnet) => {
                debug!(id = %id, type_label = %type_label, "Resolved magnet");
                Ok(magnet)
            }
            None => {
                warn!(id = %id, type_label = %type_label, "No magnet row on detail page");
                Err(ResolveError::NotFound {
                    id: id.to_string(),
                    type_label: type_label.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PAGE: &str = r#"
<table class="torrents">
  <tr class="head"><th>Series</th><th>Type</th><th>Links</th></tr>
  <tr>
    <td>1-12</td><td>WEBRip 1080p</td>
    <td><a href="/dl/1.torrent">torrent</a> <a href="magnet:?xt=urn:btih:AAA&amp;dn=show">magnet</a></td>
  </tr>
  <TR>
    <td>1-12</td><td>WEBRip 720p</td>
    <td><a href='magnet:?xt=urn:btih:BBB'>magnet</a></td>
  </TR>
  <tr><td>13</td><td>HDTVRip 480p</td><td>no magnet here</td></tr>
</table>"#;

    struct MapFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait::async_trait]
    impl PageFetcher for MapFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn resolver() -> MagnetResolver {
        let mut pages = HashMap::new();
        pages.insert(
            "https://example.org/release/show-a.html".to_string(),
            PAGE.to_string(),
        );
        MagnetResolver::new(
            Arc::new(MapFetcher { pages }),
            Arc::new(RowPatternExtractor),
            "https://example.org/release/{id}.html",
        )
    }

    #[test]
    fn test_extractor_matches_row_by_label() {
        let extractor = RowPatternExtractor;

        assert_eq!(
            extractor.find_magnet(PAGE, "WEBRip 1080p").as_deref(),
            Some("magnet:?xt=urn:btih:AAA&dn=show")
        );
        assert_eq!(
            extractor.find_magnet(PAGE, "WEBRip 720p").as_deref(),
            Some("magnet:?xt=urn:btih:BBB")
        );
    }

    #[test]
    fn test_extractor_row_without_magnet() {
        assert!(RowPatternExtractor.find_magnet(PAGE, "HDTVRip 480p").is_none());
        assert!(RowPatternExtractor.find_magnet(PAGE, "BDRip 2160p").is_none());
        assert!(RowPatternExtractor.find_magnet("", "WEBRip 1080p").is_none());
    }

    #[test]
    fn test_links_encode_spaces() {
        let links = MagnetLinks::new("https://bot.example.org/", "/magnet").unwrap();
        assert_eq!(
            links.link("show-a", "WEBRip 1080p"),
            "https://bot.example.org/magnet/show-a/WEBRip%201080p"
        );
    }

    #[test]
    fn test_links_keep_base_path() {
        let links = MagnetLinks::new("https://example.org/bot", "magnet").unwrap();
        assert_eq!(
            links.link("show-a", "BD/Remux"),
            "https://example.org/bot/magnet/show-a/BD%2FRemux"
        );
    }

    #[test]
    fn test_links_reject_non_base_url() {
        assert!(MagnetLinks::new("mailto:someone@example.org", "/magnet").is_err());
        assert!(MagnetLinks::new("not a url", "/magnet").is_err());
    }

    #[tokio::test]
    async fn test_resolve_found() {
        let magnet = resolver().resolve("show-a", "WEBRip 720p").await.unwrap();
        assert_eq!(magnet, "magnet:?xt=urn:btih:BBB");
    }

    #[tokio::test]
    async fn test_resolve_missing_label() {
        let err = resolver().resolve("show-a", "BDRip 2160p").await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::NotFound {
                id: "show-a".to_string(),
                type_label: "BDRip 2160p".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_fetch_failure() {
        let err = resolver().resolve("show-z", "WEBRip 720p").await.unwrap_err();
        assert!(matches!(err, ResolveError::Fetch { ref id, .. } if id == "show-z"));
    }

    #[test]
    fn test_extractor_matches_escaped_label() {
        let page = r#"<tr><td>1</td><td>WEB &amp; TV</td><td><a href="magnet:?xt=urn:btih:CCC">m</a></td></tr>"#;
        assert_eq!(
            RowPatternExtractor.find_magnet(page, "WEB & TV").as_deref(),
            Some("magnet:?xt=urn:btih:CCC")
        );
    }

    #[test]
    fn test_detail_url_rejects_segment_escapes() {
        let resolver = resolver();
        for id in ["../../admin/users?x=", "a/b", "show#top", "show?x=1", "..", ".", "", "a\\b"] {
            assert_eq!(
                resolver.detail_url(id),
                Err(ResolveError::InvalidId { id: id.to_string() }),
                "{:?}",
                id
            );
        }
        assert_eq!(
            resolver.detail_url("show-a").unwrap(),
            "https://example.org/release/show-a.html"
        );
        assert_eq!(
            resolver.detail_url("show%20a").unwrap(),
            "https://example.org/release/show%20a.html"
        );
    }

    #[tokio::test]
    async fn test_resolve_rejected_id_does_not_fetch() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let resolver = MagnetResolver::new(
            fetcher.clone(),
            Arc::new(RowPatternExtractor),
            "https://example.org/release/{id}.html",
        );

        let err = resolver.resolve("../../admin/users?x=", "WEB").await.unwrap_err();

        assert!(matches!(err, ResolveError::InvalidId { .. }));
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[derive(Default)]
    struct RecordingFetcher {
        requested: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl PageFetcher for RecordingFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(String::new())
        }
    }
}
