//! Telegram side of Feedwatch.
//!
//! Subscribed chats receive a captioned notification whenever the watched
//! feed carries a new release or a release gains variants. A run moves
//! through explicit stages:
//!
//! 1. ingest the feed
//! 2. reconcile against the stored baseline and save the next baseline
//! 3. render a caption per update
//! 4. deliver each caption to every subscriber
//!
//! Runs are started by a fixed-interval scheduler and never overlap.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `FEEDWATCH_FEED_URL`: Feed to poll
//! - `FEEDWATCH_DETAIL_URL`: Release page template containing `{id}`
//!
//! Optional:
//! - `FEEDWATCH_PUBLIC_URL`: External base URL of the magnet endpoint
//! - `FEEDWATCH_INTERVAL_SECS`: Seconds between checks (default: 3600)
//! - `FEEDWATCH_STATE_DIR`: State directory (default: `~/.feedwatch`)
//!
//! # Commands
//!
//! - `/start` - Subscribe this chat
//! - `/stop` - Unsubscribe this chat
//! - `/help` - Show available commands
//! - `/status` - Show subscription and last run status

pub mod bot;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod pipeline;

pub use bot::FeedwatchBot;
pub use delivery::{Delivery, DeliveryError, Notification, TelegramDelivery};
pub use error::{Result, TelegramError};
pub use pipeline::{run_scheduler, LastRun, RunOutcome, RunReport, WatchService};
