//! Runtime configuration.

use std::time::Duration;

use tracing::warn;

/// Environment variable overriding the poll interval, in seconds.
pub const POLL_INTERVAL_ENV: &str = "SENTINEL_POLL_INTERVAL_SECS";
/// Environment variable overriding the per-session capture timeout, in seconds.
pub const CAPTURE_TIMEOUT_ENV: &str = "SENTINEL_CAPTURE_TIMEOUT_SECS";
/// Environment variable overriding the notification cooldown, in seconds.
pub const COOLDOWN_ENV: &str = "SENTINEL_COOLDOWN_SECS";
/// Environment variable overriding the dedup window, in seconds.
pub const DEDUP_WINDOW_ENV: &str = "SENTINEL_DEDUP_WINDOW_SECS";
/// Environment variable restricting monitoring to sessions with a prefix.
pub const SESSION_PREFIX_ENV: &str = "SENTINEL_SESSION_PREFIX";

/// Configuration for the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// How often to poll every session.
    pub poll_interval: Duration,
    /// Upper bound on one session's capture.
    pub capture_timeout: Duration,
    /// Lines of pane text to capture per session.
    pub capture_lines: u32,
    /// Maximum captures in flight at once.
    pub max_parallel_captures: usize,
    /// Consecutive identical polls required for a quiet completion.
    pub quiet_polls: u32,
    /// Minimum gap between two notifications of the same kind for a session.
    pub cooldown: Duration,
    /// How long an identical message body stays suppressed.
    pub dedup_window: Duration,
    /// Most message hashes remembered for dedup.
    pub dedup_capacity: usize,
    /// How often the completion store is healed.
    pub heal_interval: Duration,
    /// Lines of screen text appended to a notification.
    pub preview_lines: usize,
    /// Only sessions whose names start with this are monitored.
    pub session_prefix: Option<String>,
    /// Maintain a pinned status message.
    pub dashboard: bool,
    /// Minimum gap between dashboard edits.
    pub dashboard_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            capture_timeout: Duration::from_secs(3),
            capture_lines: 50,
            max_parallel_captures: 8,
            quiet_polls: 2,
            cooldown: Duration::from_secs(30),
            dedup_window: Duration::from_secs(30 * 60),
            dedup_capacity: 256,
            heal_interval: Duration::from_secs(5 * 60),
            preview_lines: 5,
            session_prefix: None,
            dashboard: false,
            dashboard_interval: Duration::from_secs(60),
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            warn!(var = %name, value = %raw, "ignoring invalid duration");
            None
        }
    }
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `SENTINEL_*` environment variables.
    ///
    /// Unparseable or zero values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(d) = env_secs(POLL_INTERVAL_ENV) {
            config.poll_interval = d;
        }
        if let Some(d) = env_secs(CAPTURE_TIMEOUT_ENV) {
            config.capture_timeout = d;
        }
        if let Some(d) = env_secs(COOLDOWN_ENV) {
            config.cooldown = d;
        }
        if let Some(d) = env_secs(DEDUP_WINDOW_ENV) {
            config.dedup_window = d;
        }
        if let Ok(prefix) = std::env::var(SESSION_PREFIX_ENV) {
            if !prefix.trim().is_empty() {
                config.session_prefix = Some(prefix.trim().to_string());
            }
        }
        config
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the capture timeout.
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// Sets the notification cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the dedup window.
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    /// Sets the quiet-completion stability threshold.
    pub fn with_quiet_polls(mut self, polls: u32) -> Self {
        self.quiet_polls = polls.max(2);
        self
    }

    /// Restricts monitoring to sessions starting with `prefix`.
    pub fn with_session_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.session_prefix = Some(prefix.into());
        self
    }

    /// Enables the pinned dashboard.
    pub fn with_dashboard(mut self, enabled: bool) -> Self {
        self.dashboard = enabled;
        self
    }

    /// True when `session` passes the prefix filter.
    pub fn accepts(&self, session: &str) -> bool {
        match &self.session_prefix {
            Some(prefix) => session.starts_with(prefix.as_str()),
            None => true,
        }
    }
}
