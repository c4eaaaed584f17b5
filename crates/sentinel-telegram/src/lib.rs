//! Telegram notifications for Sentinel.
//!
//! This crate provides [`TelegramSink`], a [`sentinel_runtime::MessageSink`]
//! that sends "work finished" and "input needed" notifications, and the
//! pinned session dashboard, to one or more Telegram chats. The
//! `sentinel-telegram` binary wires it to the tmux poller.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `TELEGRAM_CHAT_IDS`: Comma-separated chat ids to notify
//!
//! Optional:
//! - `SENTINEL_STATE_DIR`: State directory (default: `~/.session-sentinel`)
//! - `SENTINEL_POLL_INTERVAL_SECS`, `SENTINEL_CAPTURE_TIMEOUT_SECS`,
//!   `SENTINEL_COOLDOWN_SECS`, `SENTINEL_DEDUP_WINDOW_SECS`,
//!   `SENTINEL_SESSION_PREFIX`: Runtime tuning
//!
//! # Example
//!
//! ```no_run
//! use sentinel_runtime::MessageSink;
//! use sentinel_telegram::TelegramSink;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = TelegramSink::from_env()?;
//!     sink.deliver("hello from sentinel").await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod sink;

pub use error::{Result, TelegramError};
pub use sink::{parse_chat_ids, TelegramSink, CHAT_IDS_ENV, TELEGRAM_MAX_LEN, TOKEN_ENV};
