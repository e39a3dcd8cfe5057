//! Command handlers for the Telegram bot.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

use crate::pipeline::{LastRun, WatchService};

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Subscribe this chat to release notifications")]
    Start,

    #[command(description = "Unsubscribe this chat")]
    Stop,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Show subscription and last run status")]
    Status,
}

const STORAGE_FAILURE: &str = "Something went wrong while saving your subscription. Please try again later.";

/// Reply to /start.
pub fn start_reply(newly_subscribed: bool) -> &'static str {
    if newly_subscribed {
        "Subscribed! You'll get a message whenever a release appears or gets new variants.\n\n\
        Use /stop to unsubscribe."
    } else {
        "This chat is already subscribed. Use /stop to unsubscribe."
    }
}

/// Reply to /stop.
pub fn stop_reply(was_subscribed: bool) -> &'static str {
    if was_subscribed {
        "Unsubscribed. Send /start to subscribe again."
    } else {
        "This chat isn't subscribed. Send /start to subscribe."
    }
}

/// Reply to /status.
pub fn status_reply(subscribed: bool, subscriber_count: usize, last: Option<LastRun>) -> String {
    let mut text = format!(
        "<b>Subscription:</b> {}\n<b>Subscribers:</b> {}\n",
        if subscribed { "active" } else { "inactive" },
        subscriber_count
    );

    match last {
        Some(run) => text.push_str(&format!(
            "<b>Last check:</b> {}\n<b>Updates:</b> {}, <b>sent:</b> {}, <b>skipped:</b> {}",
            run.finished_at.format("%Y-%m-%d %H:%M UTC"),
            run.report.updates,
            run.report.delivered,
            run.report.skipped_overflow
        )),
        None => text.push_str("<b>Last check:</b> not yet"),
    }
    text
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message, service: Arc<WatchService>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let reply = match service.subscribers().add(chat_id) {
        Ok(added) => {
            if added {
                info!(chat_id = %chat_id, user = ?msg.from.as_ref().map(|u| &u.username), "Chat subscribed");
            }
            start_reply(added)
        }
        Err(e) => {
            error!(chat_id = %chat_id, error = %e, "Failed to subscribe chat");
            STORAGE_FAILURE
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Handle the /stop command.
pub async fn handle_stop(bot: Bot, msg: Message, service: Arc<WatchService>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let reply = match service.subscribers().remove(chat_id) {
        Ok(removed) => {
            if removed {
                info!(chat_id = %chat_id, "Chat unsubscribed");
            }
            stop_reply(removed)
        }
        Err(e) => {
            error!(chat_id = %chat_id, error = %e, "Failed to unsubscribe chat");
            STORAGE_FAILURE
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Handle the /status command.
pub async fn handle_status(bot: Bot, msg: Message, service: Arc<WatchService>) -> ResponseResult<()> {
    let subscribers = match service.subscribers().load() {
        Ok(subscribers) => subscribers,
        Err(e) => {
            error!(error = %e, "Failed to read subscribers");
            Default::default()
        }
    };
    let text = status_reply(
        subscribers.contains(&msg.chat.id.0),
        subscribers.len(),
        service.last_run().await,
    );

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Dispatch a parsed command to its handler.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    service: Arc<WatchService>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, service).await,
        Command::Stop => handle_stop(bot, msg, service).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Status => handle_status(bot, msg, service).await,
    }
}
