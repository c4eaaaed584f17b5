//! Durable last-completion records.
//!
//! A completion is written every time a session leaves the working state,
//! regardless of whether a notification is later sent or suppressed. The
//! wait-time estimator reads these records back as its exact layer.

use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::stamp_file::StampFile;
use crate::stamps::{HealPolicy, HealReport, StampMap};

/// Session to last-completion-time store.
///
/// Lookups and writes are keyed on the normalized session name.
pub trait CompletionStore: Send + Sync {
    /// Record that `session` finished work at `at`.
    fn mark_completion(&self, session: &str, at: DateTime<Utc>) -> Result<()>;

    /// The last recorded completion for `session`.
    fn last_completion(&self, session: &str) -> Option<DateTime<Utc>>;

    /// Clamp future timestamps and prune stale records.
    fn heal(&self, now: DateTime<Utc>) -> Result<HealReport>;

    /// All records, for diagnostics.
    fn records(&self) -> Vec<(String, DateTime<Utc>)>;
}

/// JSON-file backed completion store.
///
/// ```text
/// <state_dir>/state/completions.json
/// { "api": 1720000000, "web-3": 1720000450 }
/// ```
#[derive(Debug)]
pub struct FileCompletionStore {
    file: StampFile,
    policy: HealPolicy,
}

impl FileCompletionStore {
    /// Open the store at `path` and heal it against `now`.
    ///
    /// Never fails: an unreadable file starts empty, and a failed rewrite
    /// after healing is logged and retried on the next heal.
    pub fn open(path: impl AsRef<Path>, policy: HealPolicy, now: DateTime<Utc>) -> Self {
        let store = Self {
            file: StampFile::load(path.as_ref()),
            policy,
        };
        match store.heal(now) {
            Ok(report) if !report.is_empty() => {
                info!(path = %store.path().display(), corrections = report.len(), "healed completion store on open");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to rewrite healed completion store"),
        }
        store
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn policy(&self) -> &HealPolicy {
        &self.policy
    }
}

impl CompletionStore for FileCompletionStore {
    fn mark_completion(&self, session: &str, at: DateTime<Utc>) -> Result<()> {
        let retired = self.file.update(|map| (map.insert(session, at), true))?;
        if !retired.is_empty() {
            debug!(session = %session, retired = ?retired, "retired previous session keys");
        }
        Ok(())
    }

    fn last_completion(&self, session: &str) -> Option<DateTime<Utc>> {
        self.file.read(|map| map.get(session))
    }

    fn heal(&self, now: DateTime<Utc>) -> Result<HealReport> {
        self.file.heal(now, &self.policy)
    }

    fn records(&self) -> Vec<(String, DateTime<Utc>)> {
        self.file.read(StampMap::entries)
    }
}

/// In-memory completion store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryCompletionStore {
    records: RwLock<StampMap>,
    policy: HealPolicy,
}

impl MemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: HealPolicy) -> Self {
        Self {
            records: RwLock::new(StampMap::new()),
            policy,
        }
    }

    /// Seed a raw record without normalization side effects, e.g. a
    /// deliberately corrupt future timestamp.
    pub fn seed(&self, records: impl IntoIterator<Item = (String, DateTime<Utc>)>) {
        let mut guard = self.records.write().unwrap_or_else(|e| e.into_inner());
        *guard = records.into_iter().collect();
    }
}

impl CompletionStore for MemoryCompletionStore {
    fn mark_completion(&self, session: &str, at: DateTime<Utc>) -> Result<()> {
        let mut guard = self.records.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(session, at);
        Ok(())
    }

    fn last_completion(&self, session: &str) -> Option<DateTime<Utc>> {
        let guard = self.records.read().unwrap_or_else(|e| e.into_inner());
        guard.get(session)
    }

    fn heal(&self, now: DateTime<Utc>) -> Result<HealReport> {
        let mut guard = self.records.write().unwrap_or_else(|e| e.into_inner());
        Ok(guard.heal(now, &self.policy))
    }

    fn records(&self) -> Vec<(String, DateTime<Utc>)> {
        let guard = self.records.read().unwrap_or_else(|e| e.into_inner());
        guard.entries()
    }
}
