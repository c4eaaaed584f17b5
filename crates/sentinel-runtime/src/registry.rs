//! Read-only view of monitored sessions.
//!
//! The poller owns its tracker memory outright and publishes a snapshot of
//! every session here at the end of each tick. Queries read the snapshot and
//! never block the tick for longer than the swap.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use sentinel_core::{normalize_session_name, SessionState};

use crate::estimator::{WaitEstimate, WaitTimeEstimator};

/// One session as of the last completed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub name: String,
    pub state: SessionState,
    /// When the current state was entered.
    pub since: Option<DateTime<Utc>>,
    pub activity_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// First time the daemon saw this session, across restarts.
    pub started_at: Option<DateTime<Utc>>,
    /// Last few non-blank screen lines.
    pub tail: Vec<String>,
}

/// A session with its wait estimate, as listed by [`StatusQuery::list_sessions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub view: SessionView,
    pub wait: WaitEstimate,
}

pub(crate) type Registry = Arc<RwLock<HashMap<String, SessionView>>>;

/// Cloneable handle for querying session status.
#[derive(Clone)]
pub struct StatusQuery {
    registry: Registry,
    estimator: Arc<WaitTimeEstimator>,
}

impl StatusQuery {
    pub(crate) fn new(registry: Registry, estimator: Arc<WaitTimeEstimator>) -> Self {
        Self {
            registry,
            estimator,
        }
    }

    /// The last published view of `session`.
    ///
    /// Tries the literal name first, then any live session with the same
    /// normalized name.
    pub async fn session(&self, session: &str) -> Option<SessionView> {
        let registry = self.registry.read().await;
        lookup(&registry, session).cloned()
    }

    /// True when `session` was classified as working on the last tick.
    /// Unknown sessions are not working.
    pub async fn is_working(&self, session: &str) -> bool {
        self.session(session)
            .await
            .is_some_and(|view| view.state.is_working())
    }

    /// Wait estimate for `session`.
    ///
    /// Sessions not currently monitored still get an estimate from their
    /// completion record or the neutral default.
    pub async fn estimate(&self, session: &str) -> WaitEstimate {
        match self.session(session).await {
            Some(view) => self.estimator.estimate(&view.name, view.activity_at, &view.tail),
            None => self.estimator.estimate(session, None, &[]),
        }
    }

    /// All monitored sessions, most urgent first.
    ///
    /// Sorted by state priority, then longest wait first among sessions
    /// waiting for input, then by name.
    pub async fn list_sessions(&self) -> Vec<SessionStatus> {
        let views: Vec<SessionView> = {
            let registry = self.registry.read().await;
            registry.values().cloned().collect()
        };
        let mut statuses: Vec<SessionStatus> = views
            .into_iter()
            .map(|view| {
                let wait = self
                    .estimator
                    .estimate(&view.name, view.activity_at, &view.tail);
                SessionStatus { view, wait }
            })
            .collect();
        statuses.sort_by(compare_status);
        statuses
    }
}

fn lookup<'a>(
    registry: &'a HashMap<String, SessionView>,
    session: &str,
) -> Option<&'a SessionView> {
    if let Some(view) = registry.get(session) {
        return Some(view);
    }
    let base = normalize_session_name(session);
    registry
        .values()
        .filter(|v| normalize_session_name(&v.name) == base)
        .max_by_key(|v| v.created_at)
}

pub(crate) fn compare_status(a: &SessionStatus, b: &SessionStatus) -> Ordering {
    a.view
        .state
        .priority()
        .cmp(&b.view.state.priority())
        .then_with(|| {
            if a.view.state == SessionState::WaitingInput {
                b.wait.elapsed.cmp(&a.wait.elapsed)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.view.name.cmp(&b.view.name))
}
