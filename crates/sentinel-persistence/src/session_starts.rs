//! First-seen time per session.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::Result;
use crate::stamp_file::StampFile;
use crate::stamps::HealPolicy;

/// Persists when each live session was first observed, so the dashboard can
/// show session age across daemon restarts.
#[derive(Debug)]
pub struct SessionStartStore {
    file: StampFile,
}

impl SessionStartStore {
    /// Open the store; future timestamps are clamped on open.
    pub fn open(path: impl AsRef<Path>, now: DateTime<Utc>) -> Self {
        let store = Self {
            file: StampFile::load(path.as_ref()),
        };
        if let Err(e) = store.file.heal(now, &HealPolicy::clamp_only()) {
            warn!(error = %e, "failed to rewrite healed session-start store");
        }
        store
    }

    /// Record `at` as the start of `session` unless one is already on record.
    /// Returns the recorded start.
    pub fn observe(&self, session: &str, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.file.update(|map| {
            let existed = map.contains_exact(session);
            let start = map.insert_if_absent(session, at);
            (start, !existed)
        })
    }

    /// The recorded start of `session`.
    pub fn started_at(&self, session: &str) -> Option<DateTime<Utc>> {
        self.file.read(|map| map.get(session))
    }

    /// Drop records for sessions not in `live`. Returns how many were removed.
    pub fn retain_live(&self, live: &[&str]) -> Result<usize> {
        self.file.update(|map| {
            let removed = map.retain(|key| live.contains(&key));
            (removed, removed > 0)
        })
    }
}
