//! Per-session state memory and transition detection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use sentinel_core::{ScreenSnapshot, SessionState, StateClassifier};

use crate::event::StateTransition;
use crate::notification::NotificationKind;

/// Number of screen lines retained after a tick.
const TAIL_LINES: usize = 8;

/// What the tracker remembers about one session between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMemory {
    /// Last classified state.
    pub state: SessionState,
    /// Hash of the last successfully captured screen.
    pub last_hash: Option<u64>,
    /// Consecutive polls that produced `last_hash`.
    pub stable_polls: u32,
    /// When the last transition happened.
    pub last_transition_at: Option<DateTime<Utc>>,
    /// The state the session settled from at its last transition.
    pub settled_from: SessionState,
    /// Whether a completion was already recorded for the current episode.
    /// Cleared when the session enters `Working`, or `Unknown` from a
    /// settled state.
    pub completion_reported: bool,
    /// Last few non-blank screen lines.
    pub tail: Vec<String>,
}

impl SessionMemory {
    fn new(completion_reported: bool) -> Self {
        Self {
            state: SessionState::Unknown,
            last_hash: None,
            stable_polls: 0,
            last_transition_at: None,
            settled_from: SessionState::Unknown,
            completion_reported,
            tail: Vec::new(),
        }
    }
}

/// Result of observing one session for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub session: String,
    pub state: SessionState,
    pub transition: Option<StateTransition>,
    pub quiet_completion: bool,
    /// Whether the capture failed this tick.
    pub fetch_failed: bool,
}

impl Observation {
    /// The session finished work this tick, by transition or quietly.
    pub fn records_completion(&self) -> bool {
        self.quiet_completion || self.transition.as_ref().is_some_and(|t| t.left_working())
    }

    /// The single notification this observation calls for, if any.
    ///
    /// Entering `WaitingInput` takes precedence over work completion, so
    /// Working to WaitingInput yields one WaitingInput notification.
    pub fn notification_kind(&self) -> Option<NotificationKind> {
        if let Some(t) = &self.transition {
            if t.entered_waiting() {
                return Some(NotificationKind::WaitingInput);
            }
            if t.left_working() {
                return Some(NotificationKind::WorkComplete);
            }
        }
        self.quiet_completion
            .then_some(NotificationKind::WorkComplete)
    }
}

/// Tracks the last observed state of every session.
///
/// Owned by the poller task and only mutated from its tick; nothing here is
/// shared across threads.
#[derive(Debug)]
pub struct TransitionTracker {
    classifier: Arc<StateClassifier>,
    quiet_polls: u32,
    sessions: HashMap<String, SessionMemory>,
}

impl TransitionTracker {
    pub fn new(classifier: Arc<StateClassifier>, quiet_polls: u32) -> Self {
        Self {
            classifier,
            quiet_polls: quiet_polls.max(2),
            sessions: HashMap::new(),
        }
    }

    pub fn classifier(&self) -> &StateClassifier {
        &self.classifier
    }

    /// Memory for `session`, if it has been observed.
    pub fn memory(&self, session: &str) -> Option<&SessionMemory> {
        self.sessions.get(session)
    }

    pub fn is_tracked(&self, session: &str) -> bool {
        self.sessions.contains_key(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Start tracking `session` unless it is already tracked.
    ///
    /// A session that already has a completion on record starts with its
    /// episode reported, so a screen that was sitting idle when first seen
    /// does not count as a new completion.
    pub fn track(&mut self, session: &str, has_history: bool) {
        self.sessions
            .entry(session.to_string())
            .or_insert_with(|| SessionMemory::new(has_history));
    }

    /// Observe one capture result.
    ///
    /// A failed capture (`None`) reports `Unknown` for this tick and leaves
    /// the session's memory untouched, so no transition is recorded from it.
    pub fn observe(
        &mut self,
        session: &str,
        capture: Option<&ScreenSnapshot>,
        now: DateTime<Utc>,
    ) -> Observation {
        let memory = self
            .sessions
            .entry(session.to_string())
            .or_insert_with(|| SessionMemory::new(false));

        let Some(snapshot) = capture else {
            return Observation {
                session: session.to_string(),
                state: SessionState::Unknown,
                transition: None,
                quiet_completion: false,
                fetch_failed: true,
            };
        };

        let state = self.classifier.classify_snapshot(snapshot);
        let previous_hash = memory.last_hash;

        if previous_hash == Some(snapshot.hash()) {
            memory.stable_polls = memory.stable_polls.saturating_add(1);
        } else {
            memory.stable_polls = 1;
        }
        memory.last_hash = Some(snapshot.hash());
        memory.tail = snapshot.tail(TAIL_LINES).into_iter().map(String::from).collect();

        let transition = (state != memory.state).then(|| StateTransition {
            session: session.to_string(),
            from: memory.state,
            to: state,
            at: now,
        });

        if let Some(t) = &transition {
            memory.settled_from = t.from;
            memory.state = t.to;
            memory.last_transition_at = Some(now);
            if t.to == SessionState::Working
                || (t.to == SessionState::Unknown && t.from != SessionState::Working)
            {
                memory.completion_reported = false;
            }
            if t.left_working() {
                memory.completion_reported = true;
            }
        }

        let quiet_completion = transition.is_none()
            && state == SessionState::Idle
            && !memory.completion_reported
            && matches!(memory.settled_from, SessionState::Working | SessionState::Unknown)
            && memory.stable_polls >= self.quiet_polls
            && self
                .classifier
                .detect_quiet_completion(snapshot, previous_hash);

        if quiet_completion {
            memory.completion_reported = true;
        }

        Observation {
            session: session.to_string(),
            state,
            transition,
            quiet_completion,
            fetch_failed: false,
        }
    }

    /// Forget sessions not in `live`. Returns the dropped names.
    pub fn retain_live<'a>(&mut self, live: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let live: std::collections::HashSet<&str> = live.into_iter().collect();
        let dropped: Vec<String> = self
            .sessions
            .keys()
            .filter(|k| !live.contains(k.as_str()))
            .cloned()
            .collect();
        for name in &dropped {
            self.sessions.remove(name);
        }
        dropped
    }
}
