//! The seam between the monitor and the terminal multiplexer.

use crate::{Result, TmuxSession};

/// Something that can enumerate live sessions and capture their screens.
///
/// Calls are blocking; the runtime runs them on the blocking pool under a
/// timeout. Implemented by [`crate::TmuxOrchestrator`] and by scripted
/// fakes in tests.
pub trait SessionSource: Send + Sync {
    /// All live sessions.
    fn list_sessions(&self) -> Result<Vec<TmuxSession>>;

    /// The last `lines` lines of the session's active pane.
    fn capture(&self, session: &str, lines: u32) -> Result<String>;
}
