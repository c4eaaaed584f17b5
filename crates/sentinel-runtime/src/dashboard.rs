//! Pinned status message.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use sentinel_core::{display_name, truncate};

use crate::registry::SessionStatus;
use crate::sink::{MessageRef, MessageSink};

/// Render the session list as one message.
pub fn render(statuses: &[SessionStatus], prefix: Option<&str>) -> String {
    if statuses.is_empty() {
        return "📋 No sessions".to_string();
    }
    let mut lines = vec![format!("📋 Sessions ({})", statuses.len())];
    for status in statuses {
        lines.push(format!(
            "{} {} · {} · {}",
            status.view.state.icon(),
            display_name(&status.view.name, prefix),
            status.view.state.label(),
            status.wait.display()
        ));
    }
    lines.join("\n")
}

/// Keeps one pinned message in sync with the session list.
#[derive(Debug, Default)]
pub struct Dashboard {
    message: Option<MessageRef>,
    last_text: Option<String>,
    last_refresh: Option<DateTime<Utc>>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pinned message, once one has been sent.
    pub fn message(&self) -> Option<&MessageRef> {
        self.message.as_ref()
    }

    /// Whether a refresh is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => (now - last).to_std().map_or(false, |gap| gap >= interval),
        }
    }

    /// Bring the pinned message up to date with `text`.
    ///
    /// Edits the existing message; sends and pins a new one when there is
    /// none or the edit fails. Unchanged text is not re-sent.
    pub async fn refresh(&mut self, sink: &dyn MessageSink, text: &str, now: DateTime<Utc>) {
        self.last_refresh = Some(now);
        let text = truncate(text, sink.max_message_len().saturating_sub(1));
        if self.last_text.as_deref() == Some(text.as_str()) {
            debug!("dashboard unchanged");
            return;
        }

        if let Some(message) = &self.message {
            match sink.edit(message, &text).await {
                Ok(()) => {
                    self.last_text = Some(text);
                    return;
                }
                Err(e) => warn!(error = %e, "failed to edit dashboard, sending a new one"),
            }
        }

        match sink.deliver(&text).await {
            Ok(message) => {
                if let Err(e) = sink.pin(&message).await {
                    warn!(error = %e, "failed to pin dashboard");
                }
                self.message = Some(message);
                self.last_text = Some(text);
            }
            Err(e) => {
                warn!(error = %e, "failed to send dashboard");
                self.message = None;
            }
        }
    }
}
