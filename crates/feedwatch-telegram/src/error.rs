//! Error types for the Telegram bot and the update pipeline.

use feedwatch_core::{ConfigError, FeedError, FetchError};
use feedwatch_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur in the bot or during an update run.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Runtime settings are missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The public URL can't serve as a base for magnet links.
    #[error("Invalid public URL {url}: {reason}")]
    InvalidPublicUrl { url: String, reason: String },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Fetch(#[from] FetchError),

    /// Feed ingestion failed; the run is aborted.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Baseline or subscriber file could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
