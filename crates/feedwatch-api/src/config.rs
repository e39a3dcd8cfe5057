//! API configuration.

use std::time::Instant;

use feedwatch_core::DEFAULT_MAGNET_PREFIX;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Path prefix of the magnet redirect endpoint.
    pub magnet_prefix: String,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl ApiConfig {
    /// Creates a new API configuration with the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            magnet_prefix: DEFAULT_MAGNET_PREFIX.to_string(),
            start_time: Instant::now(),
        }
    }

    /// Sets the magnet endpoint prefix.
    pub fn with_magnet_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.magnet_prefix = prefix.into();
        self
    }

    /// Returns the bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Route pattern of the magnet endpoint, always rooted at `/`.
    pub fn magnet_route(&self) -> String {
        let prefix = self.magnet_prefix.trim_matches('/');
        if prefix.is_empty() {
            "/:id/:type_label".to_string()
        } else {
            format!("/{}/:id/:type_label", prefix)
        }
    }

    /// Returns the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 8080)
    }
}
