//! Outbound message channel.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use sentinel_core::message::split_message;

/// Errors reported by a [`MessageSink`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// The transport rejected or failed to deliver the message.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The sink cannot perform this operation.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

/// One delivered message in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Reference to a delivered message, one handle per recipient chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRef {
    pub handles: Vec<MessageHandle>,
}

impl MessageRef {
    pub fn new(handles: Vec<MessageHandle>) -> Self {
        Self { handles }
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// A chat channel that can receive, edit, and pin messages.
///
/// Delivery is fire-and-forget from the runtime's point of view: failures are
/// logged and never retried.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Hard upper bound on one message's length, in bytes.
    fn max_message_len(&self) -> usize;

    /// Send a message no longer than [`Self::max_message_len`].
    async fn deliver(&self, text: &str) -> Result<MessageRef, SinkError>;

    /// Replace the text of a previously delivered message.
    async fn edit(&self, message: &MessageRef, text: &str) -> Result<(), SinkError>;

    /// Pin a previously delivered message.
    async fn pin(&self, message: &MessageRef) -> Result<(), SinkError>;
}

/// Split `text` to the sink's limit and deliver every part in order.
///
/// Stops at the first failed part. Returns the reference of the first part.
pub async fn deliver_split(sink: &dyn MessageSink, text: &str) -> Result<MessageRef, SinkError> {
    let parts = split_message(text, sink.max_message_len());
    let total = parts.len();
    let mut first = None;
    for (i, part) in parts.iter().enumerate() {
        let sent = sink.deliver(part).await?;
        debug!(part = i + 1, total, "delivered message part");
        if first.is_none() {
            first = Some(sent);
        }
    }
    Ok(first.unwrap_or_default())
}

/// A sink that drops everything, for running without a chat channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl MessageSink for NullSink {
    fn max_message_len(&self) -> usize {
        4096
    }

    async fn deliver(&self, text: &str) -> Result<MessageRef, SinkError> {
        debug!(len = text.len(), "null sink dropped message");
        Ok(MessageRef::default())
    }

    async fn edit(&self, _message: &MessageRef, _text: &str) -> Result<(), SinkError> {
        Ok(())
    }

    async fn pin(&self, _message: &MessageRef) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        max: usize,
        sent: Mutex<Vec<String>>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl MessageSink for Recording {
        fn max_message_len(&self) -> usize {
            self.max
        }

        async fn deliver(&self, text: &str) -> Result<MessageRef, SinkError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after.is_some_and(|n| sent.len() >= n) {
                return Err(SinkError::Delivery("boom".to_string()));
            }
            sent.push(text.to_string());
            Ok(MessageRef::new(vec![MessageHandle {
                chat_id: 1,
                message_id: sent.len() as i64,
            }]))
        }

        async fn edit(&self, _message: &MessageRef, _text: &str) -> Result<(), SinkError> {
            Err(SinkError::Unsupported("edit"))
        }

        async fn pin(&self, _message: &MessageRef) -> Result<(), SinkError> {
            Err(SinkError::Unsupported("pin"))
        }
    }

    #[tokio::test]
    async fn test_deliver_split_sends_tagged_parts() {
        let sink = Recording {
            max: 40,
            sent: Mutex::new(Vec::new()),
            fail_after: None,
        };
        let text = format!("{}\n{}", "x".repeat(25), "y".repeat(25));

        let first = deliver_split(&sink, &text).await.unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with("(1/2) "));
        assert_eq!(first.handles[0].message_id, 1);
    }

    #[tokio::test]
    async fn test_deliver_split_stops_on_failure() {
        let sink = Recording {
            max: 40,
            sent: Mutex::new(Vec::new()),
            fail_after: Some(1),
        };
        let text = format!("{}\n{}\n{}", "a".repeat(25), "b".repeat(25), "c".repeat(25));

        let result = deliver_split(&sink, &text).await;

        assert!(matches!(result, Err(SinkError::Delivery(_))));
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }
}
