//! A [`StampMap`] mirrored to a JSON file.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;
use crate::stamps::{HealPolicy, HealReport, StampMap};

/// Snapshot reads through an `RwLock`; writes serialized by a separate mutex
/// held across the disk write, so two writers never race the rename.
#[derive(Debug)]
pub(crate) struct StampFile {
    path: PathBuf,
    records: RwLock<StampMap>,
    write_lock: Mutex<()>,
}

impl StampFile {
    /// Load from `path`. A missing file is empty; an unreadable or corrupt
    /// one is logged and treated as empty.
    pub(crate) fn load(path: &Path) -> Self {
        let records = match read_json_optional::<StampMap>(path) {
            Ok(Some(map)) => {
                debug!(path = %path.display(), records = map.len(), "loaded timestamp records");
                map
            }
            Ok(None) => StampMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load records, starting empty");
                StampMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            records: RwLock::new(records),
            write_lock: Mutex::new(()),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against a read snapshot.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&StampMap) -> R) -> R {
        let guard = self.records.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Apply `f` and persist the result if `f` reports a change.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut StampMap) -> (R, bool)) -> Result<R> {
        let _writer = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let (result, snapshot) = {
            let mut guard = self.records.write().unwrap_or_else(|e| e.into_inner());
            let (result, changed) = f(&mut guard);
            (result, changed.then(|| guard.clone()))
        };
        if let Some(snapshot) = snapshot {
            atomic_write_json(&self.path, &snapshot)?;
        }
        Ok(result)
    }

    /// Heal in memory and rewrite the file when anything changed.
    pub(crate) fn heal(&self, now: DateTime<Utc>, policy: &HealPolicy) -> Result<HealReport> {
        self.update(|map| {
            let report = map.heal(now, policy);
            let changed = !report.is_empty();
            (report, changed)
        })
    }
}
