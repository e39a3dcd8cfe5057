//! Telegram bot wiring.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{info, warn};

use crate::delivery::TelegramDelivery;
use crate::error::{Result, TelegramError};
use crate::handlers::{handle_command, Command};
use crate::pipeline::WatchService;

/// Environment variable holding the bot token.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// The Feedwatch Telegram bot.
pub struct FeedwatchBot {
    bot: Bot,
}

impl FeedwatchBot {
    /// Create a bot from `TELEGRAM_BOT_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| TelegramError::NoToken)?;
        Ok(Self::new(token))
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    /// Delivery transport sharing this bot's client.
    pub fn delivery(&self) -> TelegramDelivery {
        TelegramDelivery::new(self.bot.clone())
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Serve subscriber commands in polling mode until Ctrl+C.
    pub async fn start_polling(&self, service: Arc<WatchService>) {
        info!("Starting Telegram bot in polling mode...");

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let service = Arc::clone(&service);
                        info!(chat_id = %msg.chat.id, command = ?cmd, "Command received");
                        async move { handle_command(bot, msg, cmd, service).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                    .endpoint(|bot: Bot, msg: Message| async move {
                        let command = msg
                            .text()
                            .and_then(|t| t.split_whitespace().next())
                            .unwrap_or_default()
                            .to_string();
                        bot.send_message(
                            msg.chat.id,
                            format!(
                                "Unknown command: {}\n\nUse /help to see available commands.",
                                command
                            ),
                        )
                        .await?;
                        Ok(())
                    }),
            );

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                warn!(update = ?upd.id, "Unhandled update");
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}
