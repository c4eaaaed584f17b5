//! Session activity states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Activity state of a monitored session, inferred from its screen text.
///
/// Variants are declared in priority order: `Error` (0) has the highest
/// precedence and `Unknown` (4) the lowest. The ordering is only a tie-break;
/// the classifier decides states procedurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Error text is visible near the bottom of the screen.
    Error,
    /// The agent is asking a yes/no or numbered-choice question.
    WaitingInput,
    /// A long-running operation is in progress.
    Working,
    /// A bare prompt is showing.
    Idle,
    /// Nothing recognizable, or the screen could not be captured.
    Unknown,
}

impl SessionState {
    /// All states in priority order.
    pub const ALL: [SessionState; 5] = [
        SessionState::Error,
        SessionState::WaitingInput,
        SessionState::Working,
        SessionState::Idle,
        SessionState::Unknown,
    ];

    /// Numeric priority (lower wins ties).
    pub fn priority(self) -> u8 {
        match self {
            SessionState::Error => 0,
            SessionState::WaitingInput => 1,
            SessionState::Working => 2,
            SessionState::Idle => 3,
            SessionState::Unknown => 4,
        }
    }

    /// Returns true for the `Working` state.
    pub fn is_working(self) -> bool {
        self == SessionState::Working
    }

    /// Short lowercase label used in logs and the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Error => "error",
            SessionState::WaitingInput => "waiting",
            SessionState::Working => "working",
            SessionState::Idle => "idle",
            SessionState::Unknown => "unknown",
        }
    }

    /// Single-glyph marker for chat output.
    pub fn icon(self) -> &'static str {
        match self {
            SessionState::Error => "❌",
            SessionState::WaitingInput => "❓",
            SessionState::Working => "⚙️",
            SessionState::Idle => "💤",
            SessionState::Unknown => "·",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
