//! Async runtime for Sentinel.
//!
//! This crate turns periodic screen captures into notifications:
//! - `TransitionTracker` - remembers each session's last state and spots changes
//! - `NotificationDecider` - records completions, applies cooldown and dedup
//! - `WaitTimeEstimator` - how long a session has been sitting since it finished
//! - `OutputPoller` - the tick loop tying capture, tracking and delivery together
//! - `Runtime` - main entry point owning the poller task
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sentinel_runtime::{NullSink, Runtime, RuntimeConfig};
//! use sentinel_tmux::TmuxOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tmux = Arc::new(TmuxOrchestrator::new()?);
//!     let mut runtime = Runtime::builder(tmux, Arc::new(NullSink))
//!         .with_config(RuntimeConfig::from_env())
//!         .build();
//!
//!     let mut events = runtime.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     runtime.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Key Concepts
//!
//! ## Ticks
//!
//! Every `poll_interval` the poller re-enumerates sessions, captures each
//! one on the blocking pool under a timeout, classifies the text, and feeds
//! the result to the tracker. A capture that fails or times out counts as
//! `Unknown` for that tick and records no transition.
//!
//! ## Completions
//!
//! Leaving `Working`, or sitting at a bare prompt on an unchanged screen for
//! two polls, records a completion in the `CompletionStore` before any
//! notification is considered. Suppression and delivery failures never lose
//! a completion.
//!
//! ## Queries
//!
//! `StatusQuery` reads a snapshot the poller publishes at the end of every
//! tick, so queries never contend with the tick itself.

pub mod config;
pub mod dashboard;
pub mod decider;
pub mod error;
pub mod estimator;
pub mod event;
pub mod notification;
pub mod poller;
pub mod registry;
pub mod runtime;
pub mod sink;
pub mod tracker;

pub use config::RuntimeConfig;
pub use dashboard::Dashboard;
pub use decider::{Decision, NotificationDecider};
pub use error::{Result, RuntimeError};
pub use estimator::{EstimateSource, EstimatorConfig, WaitEstimate, WaitTimeEstimator};
pub use event::{RuntimeEvent, StateTransition, Suppression};
pub use notification::{NotificationEvent, NotificationKind};
pub use poller::{OutputPoller, TickReport};
pub use registry::{SessionStatus, SessionView, StatusQuery};
pub use runtime::{Runtime, RuntimeBuilder};
pub use sink::{deliver_split, MessageHandle, MessageRef, MessageSink, NullSink, SinkError};
pub use tracker::{Observation, SessionMemory, TransitionTracker};
