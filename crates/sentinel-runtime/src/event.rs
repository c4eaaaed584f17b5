//! Runtime events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sentinel_core::SessionState;

use crate::notification::NotificationKind;

/// A change in a session's classified state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub session: String,
    pub from: SessionState,
    pub to: SessionState,
    pub at: DateTime<Utc>,
}

impl StateTransition {
    /// The session stopped working.
    pub fn left_working(&self) -> bool {
        self.from == SessionState::Working && self.to != SessionState::Working
    }

    /// The session started asking for input.
    pub fn entered_waiting(&self) -> bool {
        self.from != SessionState::WaitingInput && self.to == SessionState::WaitingInput
    }
}

/// Why a notification was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// The same kind was sent for this session too recently.
    Cooldown,
    /// An identical message body was sent recently.
    Duplicate,
}

/// Events emitted by the runtime.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A session was seen for the first time.
    SessionAppeared { session: String },
    /// A session is no longer reported by tmux.
    SessionVanished { session: String },
    /// A session's classified state changed.
    StateChanged(StateTransition),
    /// A completion was recorded.
    CompletionRecorded {
        session: String,
        at: DateTime<Utc>,
    },
    /// A notification was delivered.
    Notified {
        session: String,
        kind: NotificationKind,
    },
    /// A notification was decided on but suppressed.
    Suppressed {
        session: String,
        kind: NotificationKind,
        reason: Suppression,
    },
    /// Delivering a notification failed.
    DeliveryFailed { session: String, error: String },
    /// The completion store was healed.
    Healed { corrections: usize },
}

impl RuntimeEvent {
    /// Returns the session associated with this event, if any.
    pub fn session(&self) -> Option<&str> {
        match self {
            RuntimeEvent::SessionAppeared { session }
            | RuntimeEvent::SessionVanished { session }
            | RuntimeEvent::CompletionRecorded { session, .. }
            | RuntimeEvent::Notified { session, .. }
            | RuntimeEvent::Suppressed { session, .. }
            | RuntimeEvent::DeliveryFailed { session, .. } => Some(session),
            RuntimeEvent::StateChanged(t) => Some(&t.session),
            RuntimeEvent::Healed { .. } => None,
        }
    }

    /// Returns true if this is a failure event.
    pub fn is_error(&self) -> bool {
        matches!(self, RuntimeEvent::DeliveryFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(from: SessionState, to: SessionState) -> StateTransition {
        StateTransition {
            session: "api".to_string(),
            from,
            to,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_transition_predicates() {
        assert!(transition(SessionState::Working, SessionState::Idle).left_working());
        assert!(transition(SessionState::Working, SessionState::Unknown).left_working());
        assert!(!transition(SessionState::Idle, SessionState::Working).left_working());

        assert!(transition(SessionState::Idle, SessionState::WaitingInput).entered_waiting());
        assert!(transition(SessionState::Working, SessionState::WaitingInput).entered_waiting());
        assert!(!transition(SessionState::WaitingInput, SessionState::Idle).entered_waiting());
    }

    #[test]
    fn test_event_session() {
        let event = RuntimeEvent::StateChanged(transition(SessionState::Idle, SessionState::Working));
        assert_eq!(event.session(), Some("api"));
        assert_eq!(RuntimeEvent::Healed { corrections: 2 }.session(), None);

        let event = RuntimeEvent::DeliveryFailed {
            session: "api".to_string(),
            error: "timeout".to_string(),
        };
        assert!(event.is_error());
    }
}
