//! Output poller for monitoring tmux sessions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use sentinel_core::{display_name, Clock, ScreenSnapshot, StateClassifier};
use sentinel_persistence::{CompletionStore, EventLog, SessionStartStore};
use sentinel_tmux::{SessionSource, TmuxSession};

use crate::config::RuntimeConfig;
use crate::dashboard::{render, Dashboard};
use crate::decider::{Decision, NotificationDecider};
use crate::error::{Result, RuntimeError};
use crate::estimator::WaitTimeEstimator;
use crate::event::RuntimeEvent;
use crate::registry::{Registry, SessionView, StatusQuery};
use crate::sink::{deliver_split, MessageSink};
use crate::tracker::TransitionTracker;

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sessions enumerated this tick.
    pub sessions: usize,
    /// Captures that failed or timed out.
    pub capture_failures: usize,
    /// State transitions recorded.
    pub transitions: usize,
    /// Notifications delivered.
    pub delivered: usize,
    /// Notifications suppressed by cooldown or dedup.
    pub suppressed: usize,
    /// Notifications whose delivery failed.
    pub delivery_failures: usize,
}

/// Shared collaborators handed to the poller by the runtime.
pub(crate) struct PollerDeps {
    pub source: Arc<dyn SessionSource>,
    pub sink: Arc<dyn MessageSink>,
    pub store: Arc<dyn CompletionStore>,
    pub clock: Arc<dyn Clock>,
    pub classifier: Arc<StateClassifier>,
    pub estimator: Arc<WaitTimeEstimator>,
    pub registry: Registry,
    pub events: broadcast::Sender<RuntimeEvent>,
    pub session_starts: Option<Arc<SessionStartStore>>,
    pub event_log: Option<Arc<EventLog>>,
}

/// Polls tmux sessions, tracks their state, and sends notifications.
///
/// All per-session memory lives here and is only touched from
/// [`OutputPoller::poll_once`], one tick at a time.
pub struct OutputPoller {
    source: Arc<dyn SessionSource>,
    sink: Arc<dyn MessageSink>,
    store: Arc<dyn CompletionStore>,
    clock: Arc<dyn Clock>,
    config: RuntimeConfig,
    tracker: TransitionTracker,
    decider: NotificationDecider,
    query: StatusQuery,
    registry: Registry,
    events: broadcast::Sender<RuntimeEvent>,
    session_starts: Option<Arc<SessionStartStore>>,
    event_log: Option<Arc<EventLog>>,
    dashboard: Dashboard,
    known: HashSet<String>,
    last_heal: Option<DateTime<Utc>>,
}

impl OutputPoller {
    pub(crate) fn new(config: RuntimeConfig, deps: PollerDeps) -> Self {
        let tracker = TransitionTracker::new(Arc::clone(&deps.classifier), config.quiet_polls);
        let decider = NotificationDecider::new(
            Arc::clone(&deps.store),
            config.cooldown,
            config.dedup_window,
            config.dedup_capacity,
        );
        let query = StatusQuery::new(Arc::clone(&deps.registry), Arc::clone(&deps.estimator));
        Self {
            source: deps.source,
            sink: deps.sink,
            store: deps.store,
            clock: deps.clock,
            config,
            tracker,
            decider,
            query,
            registry: deps.registry,
            events: deps.events,
            session_starts: deps.session_starts,
            event_log: deps.event_log,
            dashboard: Dashboard::new(),
            known: HashSet::new(),
            last_heal: None,
        }
    }

    /// The configuration this poller runs with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The transition tracker, for inspection.
    pub fn tracker(&self) -> &TransitionTracker {
        &self.tracker
    }

    /// Run the polling loop until shutdown signal.
    ///
    /// A tick in progress when the signal arrives runs to completion.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let poll_interval = self.config.poll_interval;
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            poll_interval_ms = poll_interval.as_millis(),
            "starting output poller"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "poll tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("poller received shutdown signal");
                        break;
                    }
                }
            }
        }

        debug!("output poller stopped");
    }

    /// Run one tick: enumerate, capture, classify, notify, publish.
    ///
    /// Fails only when sessions cannot be enumerated; any single session's
    /// failure is logged and reported as `Unknown` for this tick.
    pub async fn poll_once(&mut self) -> Result<TickReport> {
        let now = self.clock.now();
        let mut report = TickReport::default();

        let source = Arc::clone(&self.source);
        let sessions = run_blocking(self.config.capture_timeout, "list sessions", move || {
            source.list_sessions()
        })
        .await?;
        let sessions: Vec<TmuxSession> = sessions
            .into_iter()
            .filter(|s| self.config.accepts(&s.name))
            .collect();
        report.sessions = sessions.len();
        trace!(count = sessions.len(), "enumerated sessions");

        let captures = self.capture_all(sessions).await;

        let live: HashSet<String> = captures.iter().map(|(s, _)| s.name.clone()).collect();
        self.forget_vanished(&live);

        let mut views = HashMap::with_capacity(captures.len());
        for (session, snapshot) in captures {
            if snapshot.is_none() {
                report.capture_failures += 1;
            }
            if self.known.insert(session.name.clone()) {
                info!(session = %session.name, "session appeared");
                self.emit(RuntimeEvent::SessionAppeared {
                    session: session.name.clone(),
                });
            }
            let view = self
                .process_session(&session, snapshot.as_ref(), now, &mut report)
                .await;
            views.insert(session.name.clone(), view);
        }

        if let Some(starts) = &self.session_starts {
            let names: Vec<&str> = live.iter().map(String::as_str).collect();
            if let Err(e) = starts.retain_live(&names) {
                warn!(error = %e, "failed to prune session starts");
            }
        }

        self.heal_if_due(now);

        *self.registry.write().await = views;

        if self.config.dashboard && self.dashboard.is_due(now, self.config.dashboard_interval) {
            let statuses = self.query.list_sessions().await;
            let text = render(&statuses, self.config.session_prefix.as_deref());
            self.dashboard.refresh(self.sink.as_ref(), &text, now).await;
        }

        debug!(
            sessions = report.sessions,
            transitions = report.transitions,
            delivered = report.delivered,
            "tick complete"
        );
        Ok(report)
    }

    async fn capture_all(
        &self,
        sessions: Vec<TmuxSession>,
    ) -> Vec<(TmuxSession, Option<ScreenSnapshot>)> {
        let timeout = self.config.capture_timeout;
        let lines = self.config.capture_lines;
        let source = Arc::clone(&self.source);

        let mut captures: Vec<(TmuxSession, Option<ScreenSnapshot>)> = stream::iter(sessions)
            .map(|session| {
                let source = Arc::clone(&source);
                async move {
                    let name = session.name.clone();
                    let result =
                        run_blocking(timeout, "capture", move || source.capture(&name, lines))
                            .await;
                    let snapshot = match result {
                        Ok(raw) => Some(ScreenSnapshot::new(&raw)),
                        Err(e) => {
                            warn!(session = %session.name, error = %e, "failed to capture output");
                            None
                        }
                    };
                    (session, snapshot)
                }
            })
            .buffer_unordered(self.config.max_parallel_captures.max(1))
            .collect()
            .await;

        captures.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        captures
    }

    async fn process_session(
        &mut self,
        session: &TmuxSession,
        snapshot: Option<&ScreenSnapshot>,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> SessionView {
        let name = session.name.as_str();
        if !self.tracker.is_tracked(name) {
            let has_history = self.store.last_completion(name).is_some();
            self.tracker.track(name, has_history);
        }
        let observation = self.tracker.observe(name, snapshot, now);

        if let Some(transition) = &observation.transition {
            report.transitions += 1;
            info!(
                session = %name,
                from = %transition.from,
                to = %transition.to,
                "state changed"
            );
            if let Some(log) = &self.event_log {
                if let Err(e) = log.append(transition) {
                    warn!(error = %e, "failed to append transition log");
                }
            }
            self.emit(RuntimeEvent::StateChanged(transition.clone()));
        }

        let tail = self
            .tracker
            .memory(name)
            .map(|m| m.tail.clone())
            .unwrap_or_default();
        let since = self.tracker.memory(name).and_then(|m| m.last_transition_at);

        let preview_start = tail.len().saturating_sub(self.config.preview_lines);
        let display = display_name(name, self.config.session_prefix.as_deref());
        let decision = self
            .decider
            .process(&observation, display, &tail[preview_start..], now);

        if observation.records_completion() {
            self.emit(RuntimeEvent::CompletionRecorded {
                session: name.to_string(),
                at: now,
            });
        }

        match decision {
            Decision::Deliver(event) => match deliver_split(self.sink.as_ref(), &event.text).await {
                Ok(_) => {
                    report.delivered += 1;
                    info!(session = %name, kind = %event.kind, "notification sent");
                    self.emit(RuntimeEvent::Notified {
                        session: event.session,
                        kind: event.kind,
                    });
                }
                Err(e) => {
                    report.delivery_failures += 1;
                    warn!(session = %name, kind = %event.kind, error = %e, "failed to deliver notification");
                    self.emit(RuntimeEvent::DeliveryFailed {
                        session: event.session,
                        error: e.to_string(),
                    });
                }
            },
            Decision::Suppressed { event, reason } => {
                report.suppressed += 1;
                self.emit(RuntimeEvent::Suppressed {
                    session: event.session,
                    kind: event.kind,
                    reason,
                });
            }
            Decision::Nothing => {}
        }

        let started_at = match &self.session_starts {
            Some(starts) => match starts.observe(name, session.created_at.min(now)) {
                Ok(at) => Some(at),
                Err(e) => {
                    warn!(session = %name, error = %e, "failed to record session start");
                    starts.started_at(name)
                }
            },
            None => None,
        };

        SessionView {
            name: name.to_string(),
            state: observation.state,
            since,
            activity_at: session.activity_at,
            created_at: session.created_at,
            started_at,
            tail,
        }
    }

    fn forget_vanished(&mut self, live: &HashSet<String>) {
        let vanished: Vec<String> = self
            .known
            .iter()
            .filter(|name| !live.contains(*name))
            .cloned()
            .collect();
        for name in vanished {
            info!(session = %name, "session vanished");
            self.known.remove(&name);
            self.decider.forget(&name);
            self.emit(RuntimeEvent::SessionVanished { session: name });
        }
        self.tracker.retain_live(live.iter().map(String::as_str));
    }

    fn heal_if_due(&mut self, now: DateTime<Utc>) {
        let due = match self.last_heal {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map_or(false, |gap| gap >= self.config.heal_interval),
        };
        if !due {
            return;
        }
        self.last_heal = Some(now);
        match self.store.heal(now) {
            Ok(report) if !report.is_empty() => {
                info!(corrections = report.len(), "healed completion store");
                self.emit(RuntimeEvent::Healed {
                    corrections: report.len(),
                });
            }
            Ok(_) => trace!("completion store healthy"),
            Err(e) => warn!(error = %e, "failed to heal completion store"),
        }
    }

    fn emit(&self, event: RuntimeEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Run a blocking tmux call on the blocking pool under `timeout`.
///
/// On timeout the blocking thread is left to finish on its own; its result
/// is discarded.
async fn run_blocking<T, F>(timeout: Duration, operation: &str, f: F) -> Result<T>
where
    F: FnOnce() -> sentinel_tmux::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(e)) => Err(RuntimeError::Task(e.to_string())),
        Err(_) => Err(RuntimeError::Timeout {
            operation: operation.to_string(),
            timeout,
        }),
    }
}
