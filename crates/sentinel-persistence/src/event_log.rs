//! Append-only JSON-lines log with size-based rotation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::atomic::ensure_parent;
use crate::error::{PersistenceError, Result};

/// Default rotation threshold.
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

/// Append-only event log, one JSON object per line.
///
/// When an append would push the file past `max_bytes` the current file is
/// renamed to `<name>.1` (replacing any previous rotation) and a fresh file
/// is started.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    max_bytes: u64,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_BYTES,
            lock: Mutex::new(()),
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the rotated file.
    pub fn rotated_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".1");
        self.path.with_file_name(name)
    }

    /// Append one record.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        ensure_parent(&self.path)?;
        self.rotate_if_needed(line.len() as u64)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| PersistenceError::WriteError {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(line.as_bytes())
            .map_err(|source| PersistenceError::WriteError {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }

    /// Read every record in the current file, skipping malformed lines.
    pub fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path).map_err(|source| PersistenceError::ReadError {
            path: self.path.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for (n, line) in data.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %self.path.display(), line = n + 1, error = %e, "skipping malformed log line"),
            }
        }
        Ok(records)
    }

    fn rotate_if_needed(&self, incoming: u64) -> Result<()> {
        let current = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if current == 0 || current + incoming <= self.max_bytes {
            return Ok(());
        }

        let rotated = self.rotated_path();
        fs::rename(&self.path, &rotated).map_err(|source| PersistenceError::WriteError {
            path: rotated.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), bytes = current, "rotated event log");
        Ok(())
    }
}
