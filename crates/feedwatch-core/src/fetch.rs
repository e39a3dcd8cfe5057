//! HTTP transport for the feed and release detail pages.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Errors raised while fetching a remote document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Fetches a remote document as text.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Timeouts applied by [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a fetcher with the given timeouts.
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(concat!("feedwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(network)?;
        debug!(url = %url, bytes = body.len(), "Fetched document");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_text_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
        let body = fetcher
            .fetch_text(&format!("{}/rss", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, "<rss/>");
    }

    #[tokio::test]
    async fn test_fetch_text_fails_on_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
        let err = fetcher
            .fetch_text(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_text_fails_on_unreachable_host() {
        let fetcher = HttpFetcher::new(FetchSettings {
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(500),
        })
        .unwrap();

        let err = fetcher.fetch_text("http://127.0.0.1:1/feed").await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
