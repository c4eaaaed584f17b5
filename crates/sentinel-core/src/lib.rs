//! Sentinel Core - screen classification and shared utilities.
//!
//! This crate holds the pure, I/O-free pieces of the monitor:
//!
//! - **state**: the five-way session activity state
//! - **snapshot**: normalized screen captures with change hashes
//! - **patterns**: configurable pattern groups for classification
//! - **classifier**: screen text to state, plus quiet-completion detection
//! - **identity**: session name normalization across recreations
//! - **clock**: injectable time source
//! - **message**: splitting long messages for chat transports
//! - **config**: filesystem layout

pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod message;
pub mod patterns;
pub mod snapshot;
pub mod state;

pub use classifier::{ClassifierConfig, StateClassifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    config_dir, ensure_all_dirs, env_file, logs_dir, patterns_file, runtime_state_dir, state_dir,
    StatePaths,
};
pub use error::{CoreError, Result};
pub use identity::{display_name, normalize_session_name};
pub use message::{split_message, truncate};
pub use patterns::{Pattern, PatternConfig, PatternSet};
pub use snapshot::{hash_text, strip_ansi, ScreenSnapshot};
pub use state::SessionState;
