//! Tmux session listing records.

use chrono::{DateTime, TimeZone, Utc};

use crate::{Result, TmuxError};

/// Format string passed to `tmux list-sessions -F`.
pub const LIST_FORMAT: &str = "#{session_name}:#{session_created}:#{session_activity}";

/// A live tmux session as reported by `list-sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxSession {
    /// Session name.
    pub name: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last time tmux saw output or input in the session.
    pub activity_at: Option<DateTime<Utc>>,
}

impl TmuxSession {
    /// Create a new TmuxSession.
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
            activity_at: None,
        }
    }

    /// Set the last activity timestamp.
    pub fn with_activity(mut self, at: DateTime<Utc>) -> Self {
        self.activity_at = Some(at);
        self
    }

    /// Parse a session from one `list-sessions` output line.
    ///
    /// Expected format: `name:created[:activity]`. tmux forbids colons in
    /// session names, so a third colon-separated field is always activity.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.splitn(3, ':');
        let name = parts.next().unwrap_or_default();
        let created = parts
            .next()
            .ok_or_else(|| TmuxError::ParseError(format!("invalid session format: {}", line)))?;
        if name.is_empty() {
            return Err(TmuxError::ParseError(format!(
                "empty session name: {}",
                line
            )));
        }

        let created_at = parse_timestamp(created)?;
        let activity_at = match parts.next() {
            Some(raw) if !raw.trim().is_empty() => Some(parse_timestamp(raw)?),
            _ => None,
        };

        Ok(Self {
            name: name.to_string(),
            created_at,
            activity_at,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|_| TmuxError::ParseError(format!("invalid timestamp: {}", raw)))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| TmuxError::ParseError(format!("invalid timestamp: {}", secs)))
}
