//! Tmux command runner.

use std::process::{Command, Output};

use tracing::{debug, trace, warn};

use crate::session::LIST_FORMAT;
use crate::{Result, SessionSource, TmuxError, TmuxSession};

/// Read-only access to the local tmux server.
#[derive(Debug, Clone)]
pub struct TmuxOrchestrator {
    /// Path to tmux binary.
    tmux_path: String,
}

impl TmuxOrchestrator {
    /// Create a new TmuxOrchestrator.
    ///
    /// # Errors
    ///
    /// Returns `TmuxError::NotFound` if tmux is not available.
    pub fn new() -> Result<Self> {
        let tmux_path = Self::find_tmux()?;
        debug!(path = %tmux_path, "tmux found");
        Ok(Self { tmux_path })
    }

    /// Use an explicit tmux binary.
    pub fn with_path(tmux_path: impl Into<String>) -> Self {
        Self {
            tmux_path: tmux_path.into(),
        }
    }

    /// Check if tmux is available in PATH.
    pub fn is_available() -> bool {
        Self::find_tmux().is_ok()
    }

    fn find_tmux() -> Result<String> {
        let output = Command::new("which").arg("tmux").output()?;

        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if path.is_empty() {
                return Err(TmuxError::NotFound);
            }
            Ok(path)
        } else {
            Err(TmuxError::NotFound)
        }
    }

    fn run_tmux(&self, args: &[&str]) -> Result<Output> {
        trace!(args = ?args, "running tmux command");
        let output = Command::new(&self.tmux_path).args(args).output()?;
        trace!(
            status = %output.status,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "tmux command completed"
        );
        Ok(output)
    }

    /// List all tmux sessions.
    ///
    /// A stopped server is not an error: it simply has no sessions.
    pub fn list_sessions(&self) -> Result<Vec<TmuxSession>> {
        let output = self.run_tmux(&["list-sessions", "-F", LIST_FORMAT])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_no_server(&stderr) {
                return Ok(Vec::new());
            }
            return Err(TmuxError::CommandFailed(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut sessions = Vec::new();
        for line in stdout.lines().filter(|l| !l.is_empty()) {
            match TmuxSession::parse(line) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(line = %line, error = %e, "failed to parse session"),
            }
        }
        Ok(sessions)
    }

    /// Capture the last `lines` lines of a session's active pane.
    ///
    /// Wrapped lines are joined so a long line hashes the same regardless of
    /// pane width.
    pub fn capture_output(&self, session: &str, lines: u32) -> Result<String> {
        let start = format!("-{}", lines);
        let target = format!("={}", session);
        let output = self.run_tmux(&["capture-pane", "-p", "-J", "-t", &target, "-S", &start])?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("can't find") || is_no_server(&stderr) {
            return Err(TmuxError::SessionNotFound(session.to_string()));
        }
        Err(TmuxError::CommandFailed(stderr.trim().to_string()))
    }
}

fn is_no_server(stderr: &str) -> bool {
    stderr.contains("no server running")
        || stderr.contains("no sessions")
        || stderr.contains("error connecting to")
}

impl SessionSource for TmuxOrchestrator {
    fn list_sessions(&self) -> Result<Vec<TmuxSession>> {
        TmuxOrchestrator::list_sessions(self)
    }

    fn capture(&self, session: &str, lines: u32) -> Result<String> {
        self.capture_output(session, lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_when_tmux_not_found() {
        // Either succeeds (tmux installed) or returns NotFound
        if let Err(e) = TmuxOrchestrator::new() {
            assert!(matches!(e, TmuxError::NotFound));
        }
    }

    #[test]
    fn test_missing_binary_is_io_error() {
        let tmux = TmuxOrchestrator::with_path("/nonexistent/bin/tmux-sentinel-test");
        assert!(matches!(tmux.list_sessions(), Err(TmuxError::Io(_))));
        assert!(matches!(tmux.capture_output("x", 10), Err(TmuxError::Io(_))));
    }

    #[test]
    fn test_no_server_detection() {
        assert!(is_no_server("no server running on /tmp/tmux-1000/default"));
        assert!(is_no_server("error connecting to /tmp/tmux-1000/default (No such file or directory)"));
        assert!(!is_no_server("unknown option -- Z"));
    }

    // Integration tests that require actual tmux
    #[test]
    #[ignore]
    fn test_capture_nonexistent_session() {
        let tmux = TmuxOrchestrator::new().unwrap();
        let result = tmux.capture_output("sentinel-nonexistent-12345", 10);
        assert!(matches!(result, Err(TmuxError::SessionNotFound(_))));
    }

    #[test]
    #[ignore]
    fn test_list_and_capture_live_session() {
        let tmux = TmuxOrchestrator::new().unwrap();
        let name = "sentinel-test-capture";
        let _ = Command::new("tmux").args(["kill-session", "-t", name]).output();
        Command::new("tmux")
            .args(["new-session", "-d", "-s", name])
            .output()
            .unwrap();

        let sessions = tmux.list_sessions().unwrap();
        let session = sessions.iter().find(|s| s.name == name).unwrap();
        assert!(session.activity_at.is_some());

        let text = tmux.capture_output(name, 50).unwrap();
        assert!(text.len() < 64 * 1024);

        let _ = Command::new("tmux").args(["kill-session", "-t", name]).output();
    }
}
