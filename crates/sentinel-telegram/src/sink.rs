//! Telegram-backed message sink.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use sentinel_runtime::{MessageHandle, MessageRef, MessageSink, SinkError};

use crate::error::{Result, TelegramError};

/// Environment variable holding the bot token.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the comma-separated chat ids to notify.
pub const CHAT_IDS_ENV: &str = "TELEGRAM_CHAT_IDS";

/// Telegram's limit on one message's text.
pub const TELEGRAM_MAX_LEN: usize = 4096;

/// Parse a comma-separated list of chat ids. Blank entries are skipped.
pub fn parse_chat_ids(raw: &str) -> Result<Vec<i64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| TelegramError::InvalidChatId(s.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    if ids.is_empty() {
        return Err(TelegramError::NoChats);
    }
    Ok(ids)
}

/// Sends notifications to a fixed set of chats.
///
/// Messages go out as plain text, so screen previews never need escaping.
pub struct TelegramSink {
    bot: Bot,
    chats: Vec<ChatId>,
}

impl TelegramSink {
    pub fn new(token: impl Into<String>, chat_ids: Vec<i64>) -> Result<Self> {
        if chat_ids.is_empty() {
            return Err(TelegramError::NoChats);
        }
        Ok(Self {
            bot: Bot::new(token),
            chats: chat_ids.into_iter().map(ChatId).collect(),
        })
    }

    /// Build from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_IDS`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(TelegramError::NoToken)?;
        let chats = std::env::var(CHAT_IDS_ENV).map_err(|_| TelegramError::NoChats)?;
        Self::new(token, parse_chat_ids(&chats)?)
    }

    /// The bot's username, confirming the token works.
    pub async fn get_me(&self) -> Result<String> {
        let me = self.bot.get_me().await?;
        Ok(me.username().to_string())
    }

    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    fn max_message_len(&self) -> usize {
        TELEGRAM_MAX_LEN
    }

    async fn deliver(&self, text: &str) -> std::result::Result<MessageRef, SinkError> {
        let mut handles = Vec::with_capacity(self.chats.len());
        let mut last_error = None;
        for &chat in &self.chats {
            match self.bot.send_message(chat, text).await {
                Ok(message) => {
                    debug!(chat_id = chat.0, message_id = message.id.0, "message sent");
                    handles.push(MessageHandle {
                        chat_id: chat.0,
                        message_id: i64::from(message.id.0),
                    });
                }
                Err(e) => {
                    warn!(chat_id = chat.0, error = %e, "failed to send message");
                    last_error = Some(e);
                }
            }
        }
        match (handles.is_empty(), last_error) {
            (true, Some(e)) => Err(SinkError::Delivery(e.to_string())),
            _ => Ok(MessageRef::new(handles)),
        }
    }

    async fn edit(&self, message: &MessageRef, text: &str) -> std::result::Result<(), SinkError> {
        if message.is_empty() {
            return Err(SinkError::Delivery("no message to edit".to_string()));
        }
        for handle in &message.handles {
            let Ok(id) = i32::try_from(handle.message_id) else {
                return Err(SinkError::Delivery(format!(
                    "message id out of range: {}",
                    handle.message_id
                )));
            };
            match self
                .bot
                .edit_message_text(ChatId(handle.chat_id), MessageId(id), text)
                .await
            {
                Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => {}
                Err(e) => return Err(SinkError::Delivery(e.to_string())),
            }
        }
        Ok(())
    }

    async fn pin(&self, message: &MessageRef) -> std::result::Result<(), SinkError> {
        for handle in &message.handles {
            let Ok(id) = i32::try_from(handle.message_id) else {
                continue;
            };
            self.bot
                .pin_chat_message(ChatId(handle.chat_id), MessageId(id))
                .disable_notification(true)
                .await
                .map_err(|e| SinkError::Delivery(e.to_string()))?;
        }
        Ok(())
    }
}
