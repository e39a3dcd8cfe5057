//! Outbound notification transport.

use std::future::Future;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use teloxide::{ApiError, RequestError};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// One rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// HTML caption, already within the caption budget.
    pub caption: String,
    /// Banner image URL; sent as a photo with the caption when present.
    pub banner: Option<String>,
}

/// Delivery failure for a single recipient.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient blocked the bot or no longer exists.
    #[error("recipient {chat_id} is unreachable: {reason}")]
    Blocked { chat_id: i64, reason: String },

    /// Any other failure; the recipient stays subscribed.
    #[error("delivery to {chat_id} failed: {reason}")]
    Other { chat_id: i64, reason: String },
}

/// Sends notifications to a single chat.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, chat_id: i64, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Splits Telegram failures into unreachable recipients and everything else.
pub fn classify(chat_id: i64, err: RequestError) -> DeliveryError {
    let reason = err.to_string();
    match err {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::UserDeactivated
            | ApiError::ChatNotFound
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup,
        ) => DeliveryError::Blocked { chat_id, reason },
        _ => DeliveryError::Other { chat_id, reason },
    }
}

/// Delivers through the Telegram Bot API in HTML parse mode.
#[derive(Clone)]
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Sends the photo if there is one, then falls back to a text message.
///
/// A rejected photo (bad banner URL, unsupported image) is retried as text so
/// the recipient still gets the release. An unreachable recipient is not.
pub async fn send_with_fallback<PhotoFut, TextFut, MakeText>(
    chat_id: i64,
    photo: Option<PhotoFut>,
    text: MakeText,
) -> Result<(), DeliveryError>
where
    PhotoFut: Future<Output = Result<(), RequestError>>,
    MakeText: FnOnce() -> TextFut,
    TextFut: Future<Output = Result<(), RequestError>>,
{
    if let Some(photo) = photo {
        match photo.await.map_err(|e| classify(chat_id, e)) {
            Ok(()) => return Ok(()),
            Err(blocked @ DeliveryError::Blocked { .. }) => return Err(blocked),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Photo rejected, sending caption as text");
            }
        }
    }
    text().await.map_err(|e| classify(chat_id, e))
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn deliver(&self, chat_id: i64, notification: &Notification) -> Result<(), DeliveryError> {
        let chat = ChatId(chat_id);

        let photo = notification
            .banner
            .as_deref()
            .and_then(|raw| Url::parse(raw).ok())
            .map(move |url| async move {
                let msg = self
                    .bot
                    .send_photo(chat, InputFile::url(url))
                    .caption(notification.caption.clone())
                    .parse_mode(ParseMode::Html)
                    .await?;
                debug!(chat_id = %chat_id, message_id = msg.id.0, "Photo notification sent");
                Ok::<(), RequestError>(())
            });

        let text = move || async move {
            let msg = self
                .bot
                .send_message(chat, notification.caption.clone())
                .parse_mode(ParseMode::Html)
                .await?;
            debug!(chat_id = %chat_id, message_id = msg.id.0, "Notification sent");
            Ok::<(), RequestError>(())
        };

        send_with_fallback(chat_id, photo, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unreachable_recipients() {
        for api_error in [
            ApiError::BotBlocked,
            ApiError::UserDeactivated,
            ApiError::ChatNotFound,
            ApiError::BotKicked,
            ApiError::BotKickedFromSupergroup,
        ] {
            let err = classify(42, RequestError::Api(api_error));
            assert!(matches!(err, DeliveryError::Blocked { chat_id: 42, .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_classify_other_failures() {
        let err = classify(7, RequestError::Api(ApiError::Unknown("Bad Request: wrong file".into())));
        assert!(matches!(err, DeliveryError::Other { chat_id: 7, .. }));
        assert!(err.to_string().contains("wrong file"));
    }

    fn rejected() -> RequestError {
        RequestError::Api(ApiError::Unknown("Bad Request: wrong type of the web page content".into()))
    }

    #[tokio::test]
    async fn test_rejected_photo_falls_back_to_text() {
        let texts = std::sync::Mutex::new(0);
        let counter = &texts;

        let result = send_with_fallback(
            5,
            Some(async { Err::<(), RequestError>(rejected()) }),
            move || async move {
                *counter.lock().unwrap() += 1;
                Ok::<(), RequestError>(())
            },
        )
        .await;

        assert_eq!(result, Ok(()));
        assert_eq!(*texts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blocked_photo_recipient_gets_no_text() {
        let texts = std::sync::Mutex::new(0);
        let counter = &texts;

        let result = send_with_fallback(
            5,
            Some(async { Err::<(), RequestError>(RequestError::Api(ApiError::BotBlocked)) }),
            move || async move {
                *counter.lock().unwrap() += 1;
                Ok::<(), RequestError>(())
            },
        )
        .await;

        assert!(matches!(result, Err(DeliveryError::Blocked { chat_id: 5, .. })));
        assert_eq!(*texts.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sent_photo_skips_text() {
        let texts = std::sync::Mutex::new(0);
        let counter = &texts;

        let result = send_with_fallback(5, Some(async { Ok::<(), RequestError>(()) }), move || async move {
            *counter.lock().unwrap() += 1;
            Ok::<(), RequestError>(())
        })
        .await;

        assert_eq!(result, Ok(()));
        assert_eq!(*texts.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_text_without_photo_is_reported() {
        let result = send_with_fallback(
            9,
            None::<std::future::Ready<Result<(), RequestError>>>,
            || async { Err::<(), RequestError>(rejected()) },
        )
        .await;

        assert!(matches!(result, Err(DeliveryError::Other { chat_id: 9, .. })));
    }
}
