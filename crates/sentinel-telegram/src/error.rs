//! Error types for the Telegram daemon.

use thiserror::Error;

/// Errors that can occur while wiring up or talking to Telegram.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// No chat to notify.
    #[error("No chat ids configured. Set TELEGRAM_CHAT_IDS to a comma-separated list.")]
    NoChats,

    /// A chat id could not be parsed.
    #[error("Invalid chat id: {0}")]
    InvalidChatId(String),

    /// Telegram API request failed.
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    /// Tmux error.
    #[error("Tmux error: {0}")]
    Tmux(#[from] sentinel_tmux::TmuxError),

    /// Pattern configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] sentinel_core::CoreError),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] sentinel_runtime::RuntimeError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
