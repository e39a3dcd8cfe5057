//! Shared configuration for Feedwatch.
//!
//! Provides functions to locate Feedwatch's state directory and files, and
//! the runtime settings read from the environment.
//!
//! # Storage Structure
//!
//! All application data is stored under `~/.feedwatch/`:
//!
//! ```text
//! ~/.feedwatch/
//! ├── config/       # .env.local with secrets
//! └── state/        # baseline.json, subscribers.json
//! ```
//!
//! # Environment Variables
//!
//! - `FEEDWATCH_STATE_DIR`: Override the base state directory
//! - `FEEDWATCH_FEED_URL`: Feed to poll (required)
//! - `FEEDWATCH_DETAIL_URL`: Detail page template containing `{id}` (required)
//! - `FEEDWATCH_PUBLIC_URL`: Externally reachable base of the magnet endpoint
//! - `FEEDWATCH_INTERVAL_SECS`: Seconds between feed checks (default: 3600)

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "FEEDWATCH_STATE_DIR";

/// Environment variable holding the feed URL.
pub const FEED_URL_ENV: &str = "FEEDWATCH_FEED_URL";

/// Environment variable holding the detail page URL template.
pub const DETAIL_URL_ENV: &str = "FEEDWATCH_DETAIL_URL";

/// Environment variable holding the public base URL of the HTTP server.
pub const PUBLIC_URL_ENV: &str = "FEEDWATCH_PUBLIC_URL";

/// Environment variable holding the check interval in seconds.
pub const INTERVAL_ENV: &str = "FEEDWATCH_INTERVAL_SECS";

/// Placeholder replaced by the release identifier in the detail template.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default interval between feed checks (one hour).
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Default public base URL of the magnet endpoint.
pub const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:8080";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".feedwatch";

// Subdirectory names
const CONFIG_SUBDIR: &str = "config";
const STATE_SUBDIR: &str = "state";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the Feedwatch state directory.
///
/// The state directory is determined by:
/// 1. `FEEDWATCH_STATE_DIR` environment variable if set
/// 2. `~/.feedwatch` if home directory is available
/// 3. `.feedwatch` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the user config directory.
pub fn config_dir() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR)
}

/// Get the runtime state directory.
pub fn runtime_state_dir() -> PathBuf {
    state_dir().join(STATE_SUBDIR)
}

/// Get the baseline file path.
pub fn baseline_file() -> PathBuf {
    runtime_state_dir().join("baseline.json")
}

/// Get the subscribers file path.
pub fn subscribers_file() -> PathBuf {
    runtime_state_dir().join("subscribers.json")
}

/// Get the .env.local file path.
///
/// Environment file for secrets (bot token).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the config and runtime state directories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(config_dir())?;
    std::fs::create_dir_all(runtime_state_dir())?;
    Ok(())
}

/// Errors raised while reading runtime settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but its value is unusable.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime settings of the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Feed to poll.
    pub feed_url: String,
    /// Detail page template; `{id}` is replaced by the release identifier.
    pub detail_url_template: String,
    /// Externally reachable base URL of the magnet endpoint server.
    pub public_url: String,
    /// Interval between feed checks.
    pub interval: Duration,
}

impl WatchConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let feed_url = lookup(FEED_URL_ENV).ok_or(ConfigError::Missing(FEED_URL_ENV))?;

        let detail_url_template =
            lookup(DETAIL_URL_ENV).ok_or(ConfigError::Missing(DETAIL_URL_ENV))?;
        if !detail_url_template.contains(ID_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                name: DETAIL_URL_ENV,
                reason: format!("template must contain {}", ID_PLACEHOLDER),
            });
        }

        let public_url = lookup(PUBLIC_URL_ENV)
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let interval_secs = match lookup(INTERVAL_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: INTERVAL_ENV,
                    reason: format!("expected a positive number of seconds, got {:?}", raw),
                })?,
            None => DEFAULT_INTERVAL_SECS,
        };

        Ok(Self {
            feed_url,
            detail_url_template,
            public_url,
            interval: Duration::from_secs(interval_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_file_names() {
        assert!(baseline_file().ends_with("state/baseline.json"));
        assert!(subscribers_file().ends_with("state/subscribers.json"));
        assert!(env_file().ends_with("config/.env.local"));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = WatchConfig::from_lookup(lookup(&[
            (FEED_URL_ENV, "https://example.org/rss"),
            (DETAIL_URL_ENV, "https://example.org/release/{id}.html"),
        ]))
        .unwrap();

        assert_eq!(config.public_url, DEFAULT_PUBLIC_URL);
        assert_eq!(config.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(config.detail_url_template, "https://example.org/release/{id}.html");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = WatchConfig::from_lookup(lookup(&[
            (FEED_URL_ENV, "https://example.org/rss"),
            (DETAIL_URL_ENV, "https://example.org/{id}"),
            (PUBLIC_URL_ENV, "https://bot.example.org/"),
            (INTERVAL_ENV, "900"),
        ]))
        .unwrap();

        assert_eq!(config.public_url, "https://bot.example.org");
        assert_eq!(config.interval, Duration::from_secs(900));
    }

    #[test]
    fn test_from_lookup_missing_feed() {
        let err = WatchConfig::from_lookup(lookup(&[(DETAIL_URL_ENV, "x/{id}")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(FEED_URL_ENV));
    }

    #[test]
    fn test_from_lookup_rejects_template_without_placeholder() {
        let err = WatchConfig::from_lookup(lookup(&[
            (FEED_URL_ENV, "https://example.org/rss"),
            (DETAIL_URL_ENV, "https://example.org/release"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: DETAIL_URL_ENV, .. }));
    }

    #[test]
    fn test_from_lookup_rejects_zero_interval() {
        let err = WatchConfig::from_lookup(lookup(&[
            (FEED_URL_ENV, "https://example.org/rss"),
            (DETAIL_URL_ENV, "https://example.org/{id}"),
            (INTERVAL_ENV, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: INTERVAL_ENV, .. }));
    }
}
