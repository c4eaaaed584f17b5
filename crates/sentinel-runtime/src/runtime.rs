//! Main runtime manager.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use sentinel_core::{Clock, StateClassifier, SystemClock};
use sentinel_persistence::{CompletionStore, EventLog, MemoryCompletionStore, SessionStartStore};
use sentinel_tmux::SessionSource;

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::estimator::{EstimatorConfig, WaitTimeEstimator};
use crate::event::RuntimeEvent;
use crate::poller::{OutputPoller, PollerDeps, TickReport};
use crate::registry::StatusQuery;
use crate::sink::MessageSink;

/// Assembles a [`Runtime`] from its collaborators.
///
/// Only the session source and the message sink are required. Everything
/// else defaults to an in-memory, system-clock setup.
pub struct RuntimeBuilder {
    source: Arc<dyn SessionSource>,
    sink: Arc<dyn MessageSink>,
    store: Option<Arc<dyn CompletionStore>>,
    clock: Option<Arc<dyn Clock>>,
    classifier: Option<StateClassifier>,
    estimator_config: EstimatorConfig,
    config: RuntimeConfig,
    session_starts: Option<Arc<SessionStartStore>>,
    event_log: Option<Arc<EventLog>>,
}

impl RuntimeBuilder {
    pub fn new(source: Arc<dyn SessionSource>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            source,
            sink,
            store: None,
            clock: None,
            classifier: None,
            estimator_config: EstimatorConfig::default(),
            config: RuntimeConfig::default(),
            session_starts: None,
            event_log: None,
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CompletionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_classifier(mut self, classifier: StateClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_estimator_config(mut self, config: EstimatorConfig) -> Self {
        self.estimator_config = config;
        self
    }

    pub fn with_session_starts(mut self, starts: Arc<SessionStartStore>) -> Self {
        self.session_starts = Some(starts);
        self
    }

    pub fn with_event_log(mut self, log: Arc<EventLog>) -> Self {
        self.event_log = Some(log);
        self
    }

    pub fn build(self) -> Runtime {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCompletionStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let classifier = Arc::new(self.classifier.unwrap_or_default());
        let estimator = Arc::new(
            WaitTimeEstimator::new(Arc::clone(&store), Arc::clone(&classifier), Arc::clone(&clock))
                .with_config(self.estimator_config),
        );
        let registry = Arc::new(RwLock::new(HashMap::new()));
        let (event_tx, _) = broadcast::channel(256);
        let (shutdown_tx, _) = watch::channel(false);

        let query = StatusQuery::new(Arc::clone(&registry), Arc::clone(&estimator));
        let poller = OutputPoller::new(
            self.config,
            PollerDeps {
                source: self.source,
                sink: self.sink,
                store,
                clock,
                classifier,
                estimator,
                registry,
                events: event_tx.clone(),
                session_starts: self.session_starts,
                event_log: self.event_log,
            },
        );

        Runtime {
            poller: Some(poller),
            poller_handle: None,
            shutdown_tx,
            event_tx,
            query,
        }
    }
}

/// Main runtime manager: owns the poller and its background task.
pub struct Runtime {
    /// The poller, while it is not running in the background.
    poller: Option<OutputPoller>,
    /// Handle to the poller task; yields the poller back on exit.
    poller_handle: Option<JoinHandle<OutputPoller>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Event broadcast channel.
    event_tx: broadcast::Sender<RuntimeEvent>,
    query: StatusQuery,
}

impl Runtime {
    /// Start a builder from the two required collaborators.
    pub fn builder(source: Arc<dyn SessionSource>, sink: Arc<dyn MessageSink>) -> RuntimeBuilder {
        RuntimeBuilder::new(source, sink)
    }

    /// Start the runtime (begins polling).
    pub async fn start(&mut self) -> Result<()> {
        if self.poller_handle.is_some() {
            return Err(RuntimeError::AlreadyStarted);
        }
        let Some(mut poller) = self.poller.take() else {
            return Err(RuntimeError::AlreadyStarted);
        };

        info!(
            poll_interval_ms = poller.config().poll_interval.as_millis(),
            "starting runtime"
        );

        self.shutdown_tx.send_replace(false);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            poller.run(shutdown_rx).await;
            poller
        });
        self.poller_handle = Some(handle);

        debug!("runtime started");
        Ok(())
    }

    /// Stop the runtime gracefully, letting an in-flight tick finish.
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.poller_handle.take() else {
            return Err(RuntimeError::NotStarted);
        };

        info!("shutting down runtime");

        self.shutdown_tx.send(true).map_err(|e| {
            RuntimeError::Shutdown(format!("failed to send shutdown signal: {}", e))
        })?;

        debug!("waiting for poller to stop");
        let poller = handle
            .await
            .map_err(|e| RuntimeError::Shutdown(format!("poller task panicked: {}", e)))?;
        self.poller = Some(poller);

        info!("runtime stopped");
        Ok(())
    }

    /// Run a single tick in the foreground. Only valid while not started.
    pub async fn poll_once(&mut self) -> Result<TickReport> {
        match self.poller.as_mut() {
            Some(poller) => poller.poll_once().await,
            None => Err(RuntimeError::AlreadyStarted),
        }
    }

    /// Subscribe to runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.event_tx.subscribe()
    }

    /// Handle for status queries; stays valid across start and shutdown.
    pub fn status(&self) -> StatusQuery {
        self.query.clone()
    }

    /// Check if the runtime has been started.
    pub fn is_started(&self) -> bool {
        self.poller_handle.is_some()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if self.poller_handle.is_some() {
            let _ = self.shutdown_tx.send(true);
        }
    }
}
