//! Scripted collaborators shared by the runtime integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use sentinel_core::ManualClock;
use sentinel_persistence::MemoryCompletionStore;
use sentinel_runtime::{
    MessageHandle, MessageRef, MessageSink, Runtime, RuntimeConfig, RuntimeEvent, SinkError,
};
use sentinel_tmux::{SessionSource, TmuxError, TmuxSession};

pub const WORKING: &str = "Reading src/lib.rs\nEditing parser\n✻ Thinking… (esc to interrupt)\n\n>";
pub const IDLE: &str = "All tests passed.\n$ ";
pub const WAITING: &str =
    "Do you want to make this edit to lib.rs?\n❯ 1. Yes\n  2. No, and tell me what to do";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[derive(Debug, Clone)]
struct ScriptedSession {
    session: TmuxSession,
    screen: Option<String>,
}

/// A session source whose screens are set by the test.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    sessions: Mutex<BTreeMap<String, ScriptedSession>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a session showing `screen`.
    pub fn show(&self, name: &str, screen: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let entry = sessions
            .entry(name.to_string())
            .or_insert_with(|| ScriptedSession {
                session: TmuxSession::new(name, start_time() - Duration::hours(1)),
                screen: None,
            });
        entry.screen = Some(screen.to_string());
    }

    /// Make captures of `name` fail until the next [`Self::show`].
    pub fn fail_capture(&self, name: &str) {
        if let Some(entry) = self.sessions.lock().unwrap().get_mut(name) {
            entry.screen = None;
        }
    }

    pub fn set_activity(&self, name: &str, at: DateTime<Utc>) {
        if let Some(entry) = self.sessions.lock().unwrap().get_mut(name) {
            entry.session.activity_at = Some(at);
        }
    }

    pub fn remove(&self, name: &str) {
        self.sessions.lock().unwrap().remove(name);
    }
}

impl SessionSource for ScriptedSource {
    fn list_sessions(&self) -> sentinel_tmux::Result<Vec<TmuxSession>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .map(|s| s.session.clone())
            .collect())
    }

    fn capture(&self, session: &str, _lines: u32) -> sentinel_tmux::Result<String> {
        let sessions = self.sessions.lock().unwrap();
        match sessions.get(session) {
            Some(ScriptedSession {
                screen: Some(text), ..
            }) => Ok(text.clone()),
            Some(_) => Err(TmuxError::CommandFailed("capture-pane failed".to_string())),
            None => Err(TmuxError::SessionNotFound(session.to_string())),
        }
    }
}

/// A sink that records every call and can be told to fail deliveries.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<String>>,
    edits: Mutex<Vec<String>>,
    pins: Mutex<usize>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().unwrap().clone()
    }

    pub fn pins(&self) -> usize {
        *self.pins.lock().unwrap()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    fn max_message_len(&self) -> usize {
        4096
    }

    async fn deliver(&self, text: &str) -> Result<MessageRef, SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Delivery("chat unreachable".to_string()));
        }
        let mut delivered = self.delivered.lock().unwrap();
        delivered.push(text.to_string());
        Ok(MessageRef::new(vec![MessageHandle {
            chat_id: 42,
            message_id: delivered.len() as i64,
        }]))
    }

    async fn edit(&self, _message: &MessageRef, text: &str) -> Result<(), SinkError> {
        self.edits.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn pin(&self, _message: &MessageRef) -> Result<(), SinkError> {
        *self.pins.lock().unwrap() += 1;
        Ok(())
    }
}

/// Everything a scenario needs to drive and observe the runtime.
pub struct Harness {
    pub source: Arc<ScriptedSource>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<MemoryCompletionStore>,
    pub clock: ManualClock,
    pub runtime: Runtime,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryCompletionStore::new()))
    }

    pub fn with_store(config: RuntimeConfig, store: Arc<MemoryCompletionStore>) -> Self {
        let source = Arc::new(ScriptedSource::new());
        let sink = Arc::new(RecordingSink::new());
        let clock = ManualClock::new(start_time());
        let runtime = Runtime::builder(source.clone(), sink.clone())
            .with_config(config)
            .with_store(store.clone())
            .with_clock(Arc::new(clock.clone()))
            .build();
        Self {
            source,
            sink,
            store,
            clock,
            runtime,
        }
    }

    /// Advance the clock by `secs` and run one tick.
    pub async fn tick_after(&mut self, secs: i64) -> sentinel_runtime::TickReport {
        self.clock.advance(Duration::seconds(secs));
        self.runtime.poll_once().await.unwrap()
    }
}

/// Drain every event currently queued on `rx`.
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<RuntimeEvent>) -> Vec<RuntimeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
