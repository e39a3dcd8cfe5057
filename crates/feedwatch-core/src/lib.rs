//! Feedwatch Core - the release watching logic shared by the bot and the
//! HTTP server.
//!
//! - **config**: State paths and runtime settings from the environment
//! - **fetch**: HTTP transport for the feed and detail pages
//! - **feed**: Feed parsing and per-release collapsing
//! - **reconcile**: Diff of a feed pull against the persisted baseline
//! - **caption**: Bounded notification captions with an aligned variant table
//! - **magnet**: Redirect links and on-demand magnet resolution

pub mod caption;
pub mod config;
pub mod feed;
pub mod fetch;
pub mod magnet;
pub mod reconcile;

// Re-export commonly used items for convenience
pub use caption::{caption_len, visible_text, CaptionError, CaptionRenderer, CAPTION_LIMIT};
pub use config::{
    baseline_file, config_dir, ensure_all_dirs, env_file, runtime_state_dir, state_dir,
    subscribers_file, ConfigError, WatchConfig,
};
pub use feed::{FeedError, FeedIngester, IngestedFeed};
pub use fetch::{FetchError, FetchSettings, HttpFetcher, PageFetcher};
pub use magnet::{
    MagnetExtractor, MagnetLinks, MagnetResolver, ResolveError, RowPatternExtractor,
    DEFAULT_MAGNET_PREFIX,
};
pub use reconcile::{reconcile, ReconciliationResult, UpdateKind};
