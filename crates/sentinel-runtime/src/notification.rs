//! Notification kinds and message composition.

use std::fmt;

use serde::{Deserialize, Serialize};

use sentinel_core::message::truncate;

/// Longest preview line kept in a notification.
const PREVIEW_LINE_MAX: usize = 200;

/// What a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The agent finished a unit of work.
    WorkComplete,
    /// The agent is asking a question.
    WaitingInput,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::WorkComplete => "work_complete",
            NotificationKind::WaitingInput => "waiting_input",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A composed notification, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub session: String,
    pub text: String,
}

/// Compose the message body for `kind` about `display_name`.
///
/// The preview is the tail of the screen, so two notifications about the
/// same session differ whenever the screen differs.
pub fn compose(kind: NotificationKind, display_name: &str, preview: &[String]) -> String {
    let mut text = match kind {
        NotificationKind::WorkComplete => format!("✅ Session \"{}\" finished work", display_name),
        NotificationKind::WaitingInput => {
            format!("❓ Session \"{}\" is waiting for input", display_name)
        }
    };

    let lines: Vec<String> = preview
        .iter()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .map(|l| truncate(l, PREVIEW_LINE_MAX))
        .collect();
    if !lines.is_empty() {
        text.push_str("\n\n");
        text.push_str(&lines.join("\n"));
    }
    text
}
