//! Persistence layer for Sentinel.
//!
//! Crash-safe storage for the little state the monitor keeps across
//! restarts, using atomic file operations (write to temp file, then rename):
//!
//! - [`CompletionStore`]: last time each session finished work, with
//!   self-healing of future and stale timestamps
//! - [`SessionStartStore`]: first time each session was seen
//! - [`EventLog`]: size-rotated JSON-lines transition log
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use sentinel_persistence::{CompletionStore, FileCompletionStore, HealPolicy};
//!
//! let store = FileCompletionStore::open("/tmp/completions.json", HealPolicy::default(), Utc::now());
//! store.mark_completion("api-3", Utc::now()).unwrap();
//!
//! // A recreated session under a new suffix finds the same record.
//! assert!(store.last_completion("api-7").is_some());
//! ```

pub mod atomic;
pub mod completion_store;
pub mod error;
pub mod event_log;
pub mod session_starts;
mod stamp_file;
pub mod stamps;

pub use completion_store::{CompletionStore, FileCompletionStore, MemoryCompletionStore};
pub use error::{PersistenceError, Result};
pub use event_log::EventLog;
pub use session_starts::SessionStartStore;
pub use stamps::{HealAction, HealPolicy, HealReport, StampMap};
