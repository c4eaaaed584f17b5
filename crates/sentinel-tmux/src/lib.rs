//! Tmux access for Sentinel.
//!
//! Sentinel only ever reads from tmux: it lists sessions and captures the
//! visible text of their active panes. Nothing here creates, kills, or types
//! into a session.
//!
//! # Example
//!
//! ```no_run
//! use sentinel_tmux::{SessionSource, TmuxOrchestrator};
//!
//! let tmux = TmuxOrchestrator::new().expect("tmux not found");
//! for session in tmux.list_sessions().unwrap() {
//!     let text = tmux.capture(&session.name, 50).unwrap();
//!     println!("{}: {} bytes", session.name, text.len());
//! }
//! ```

pub mod error;
pub mod orchestrator;
pub mod session;
pub mod source;

pub use error::{Result, TmuxError};
pub use orchestrator::TmuxOrchestrator;
pub use session::TmuxSession;
pub use source::SessionSource;
