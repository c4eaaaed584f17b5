//! Filesystem layout for Sentinel.
//!
//! # Storage Structure
//!
//! All application data is stored under `~/.session-sentinel/`:
//!
//! ```text
//! ~/.session-sentinel/
//! ├── config/       # patterns.json, .env.local
//! ├── logs/         # Daemon logs
//! └── state/        # completions.json, session_starts.json, transitions.jsonl
//! ```
//!
//! # Environment Variables
//!
//! - `SENTINEL_STATE_DIR`: Override the base state directory
//! - `SENTINEL_CONFIG_DIR`: Override the config directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "SENTINEL_STATE_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "SENTINEL_CONFIG_DIR";

const DEFAULT_STATE_DIR: &str = ".session-sentinel";

const LOGS_SUBDIR: &str = "logs";
const CONFIG_SUBDIR: &str = "config";
const STATE_SUBDIR: &str = "state";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the Sentinel base directory.
///
/// Resolved once per process from:
/// 1. `SENTINEL_STATE_DIR` if set
/// 2. `~/.session-sentinel` if a home directory is available
/// 3. `.session-sentinel` in the current directory
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the user config directory.
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(CONFIG_SUBDIR))
}

/// Get the logs directory.
pub fn logs_dir() -> PathBuf {
    state_dir().join(LOGS_SUBDIR)
}

/// Get the runtime state directory holding the persisted stores.
pub fn runtime_state_dir() -> PathBuf {
    state_dir().join(STATE_SUBDIR)
}

/// Persisted files for a given runtime state directory.
///
/// Kept separate from the process-wide [`state_dir`] so stores can be
/// pointed at a temporary directory in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub completions: PathBuf,
    pub session_starts: PathBuf,
    pub transitions: PathBuf,
}

impl StatePaths {
    /// File layout under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            completions: dir.join("completions.json"),
            session_starts: dir.join("session_starts.json"),
            transitions: dir.join("transitions.jsonl"),
        }
    }

    /// File layout under the default runtime state directory.
    pub fn default_paths() -> Self {
        Self::in_dir(&runtime_state_dir())
    }
}

/// Get the pattern override file path.
pub fn patterns_file() -> PathBuf {
    config_dir().join("patterns.json")
}

/// Get the .env.local file path for secrets (bot token, chat ids).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the base directory and all subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(logs_dir())?;
    std::fs::create_dir_all(config_dir())?;
    std::fs::create_dir_all(runtime_state_dir())?;
    Ok(())
}
