//! Notification decisions: completion recording, cooldown, and dedup.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use sentinel_core::hash_text;
use sentinel_persistence::CompletionStore;

use crate::event::Suppression;
use crate::notification::{compose, NotificationEvent, NotificationKind};
use crate::tracker::Observation;

/// Outcome of processing one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send this notification.
    Deliver(NotificationEvent),
    /// A notification was warranted but is suppressed.
    Suppressed {
        event: NotificationEvent,
        reason: Suppression,
    },
    /// Nothing to announce.
    Nothing,
}

impl Decision {
    pub fn event(&self) -> Option<&NotificationEvent> {
        match self {
            Decision::Deliver(event) | Decision::Suppressed { event, .. } => Some(event),
            Decision::Nothing => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LastSent {
    kind: NotificationKind,
    at: DateTime<Utc>,
}

/// Decides which observations become notifications.
///
/// Completion records are written before any suppression check, so a
/// suppressed or failed notification never loses a completion.
pub struct NotificationDecider {
    store: Arc<dyn CompletionStore>,
    cooldown: Duration,
    dedup_window: Duration,
    dedup_capacity: usize,
    last_sent: HashMap<String, LastSent>,
    recent: VecDeque<(u64, DateTime<Utc>)>,
}

impl NotificationDecider {
    pub fn new(
        store: Arc<dyn CompletionStore>,
        cooldown: Duration,
        dedup_window: Duration,
        dedup_capacity: usize,
    ) -> Self {
        Self {
            store,
            cooldown,
            dedup_window,
            dedup_capacity: dedup_capacity.max(1),
            last_sent: HashMap::new(),
            recent: VecDeque::new(),
        }
    }

    /// Process one observation taken at `now`.
    ///
    /// `preview` is the tail of the screen appended to the message.
    pub fn process(
        &mut self,
        observation: &Observation,
        display_name: &str,
        preview: &[String],
        now: DateTime<Utc>,
    ) -> Decision {
        if observation.records_completion() {
            if let Err(e) = self.store.mark_completion(&observation.session, now) {
                warn!(session = %observation.session, error = %e, "failed to record completion");
            }
        }

        let Some(kind) = observation.notification_kind() else {
            return Decision::Nothing;
        };

        let event = NotificationEvent {
            kind,
            session: observation.session.clone(),
            text: compose(kind, display_name, preview),
        };

        self.expire_hashes(now);

        if let Some(last) = self.last_sent.get(&observation.session) {
            if last.kind == kind && elapsed(last.at, now) < self.cooldown {
                debug!(session = %observation.session, kind = %kind, "notification in cooldown");
                return Decision::Suppressed {
                    event,
                    reason: Suppression::Cooldown,
                };
            }
        }

        let hash = hash_text(&event.text);
        if self.recent.iter().any(|(h, _)| *h == hash) {
            debug!(session = %observation.session, kind = %kind, "duplicate notification");
            return Decision::Suppressed {
                event,
                reason: Suppression::Duplicate,
            };
        }

        self.recent.push_back((hash, now));
        while self.recent.len() > self.dedup_capacity {
            self.recent.pop_front();
        }
        self.last_sent
            .insert(observation.session.clone(), LastSent { kind, at: now });

        Decision::Deliver(event)
    }

    /// Drop cooldown state for a vanished session.
    pub fn forget(&mut self, session: &str) {
        self.last_sent.remove(session);
    }

    /// Number of message hashes currently remembered.
    pub fn remembered_hashes(&self) -> usize {
        self.recent.len()
    }

    fn expire_hashes(&mut self, now: DateTime<Utc>) {
        while let Some((_, at)) = self.recent.front() {
            if elapsed(*at, now) >= self.dedup_window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }
}

fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}
