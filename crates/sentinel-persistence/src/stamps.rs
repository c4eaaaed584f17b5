//! Session-keyed timestamp maps with identity normalization and healing.
//!
//! Both the completion store and the session-start store persist a flat
//! `{ "session": unix_seconds }` JSON object. Keys keep the literal session
//! name last written, but lookups and writes go through
//! [`normalize_session_name`], so `proj-29` finds and replaces `proj-8`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use sentinel_core::identity::normalize_session_name;

/// Rules applied when healing a timestamp map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealPolicy {
    /// Records older than this are pruned. `None` keeps them forever.
    pub staleness: Option<Duration>,
    /// Future timestamps are replaced with `now - substitute_age`.
    pub substitute_age: Duration,
}

impl Default for HealPolicy {
    fn default() -> Self {
        Self {
            staleness: Some(Duration::hours(72)),
            substitute_age: Duration::minutes(15),
        }
    }
}

impl HealPolicy {
    /// Policy that only corrects future timestamps.
    pub fn clamp_only() -> Self {
        Self {
            staleness: None,
            ..Self::default()
        }
    }

    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = Some(staleness);
        self
    }

    pub fn with_substitute_age(mut self, age: Duration) -> Self {
        self.substitute_age = age;
        self
    }
}

/// One correction made while healing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealAction {
    /// A future timestamp was replaced.
    ClampedFuture {
        session: String,
        was: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    /// A record older than the staleness ceiling was removed.
    PrunedStale { session: String, at: DateTime<Utc> },
    /// A value that is not a representable timestamp was removed.
    DroppedInvalid { session: String, raw: i64 },
    /// Two keys normalized to the same session; the older one was removed.
    MergedDuplicate { retired: String, kept: String },
}

impl fmt::Display for HealAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealAction::ClampedFuture { session, was, now } => {
                write!(f, "{}: future timestamp {} replaced with {}", session, was, now)
            }
            HealAction::PrunedStale { session, at } => {
                write!(f, "{}: stale record from {} pruned", session, at)
            }
            HealAction::DroppedInvalid { session, raw } => {
                write!(f, "{}: invalid timestamp {} dropped", session, raw)
            }
            HealAction::MergedDuplicate { retired, kept } => {
                write!(f, "{}: merged into {}", retired, kept)
            }
        }
    }
}

/// Corrections made by one heal pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealReport {
    pub actions: Vec<HealAction>,
}

impl HealReport {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Number of pruned records.
    pub fn pruned(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, HealAction::PrunedStale { .. }))
            .count()
    }

    /// Number of clamped future timestamps.
    pub fn clamped(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, HealAction::ClampedFuture { .. }))
            .count()
    }
}

fn to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Session name to unix-seconds map, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StampMap(BTreeMap<String, i64>);

impl StampMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Timestamp for `session`, matching on the normalized name.
    ///
    /// An exact key wins; otherwise the newest record sharing the base name.
    pub fn get(&self, session: &str) -> Option<DateTime<Utc>> {
        if let Some(&secs) = self.0.get(session) {
            return to_datetime(secs);
        }
        let base = normalize_session_name(session);
        self.0
            .iter()
            .filter(|(k, _)| normalize_session_name(k) == base)
            .map(|(_, &v)| v)
            .max()
            .and_then(to_datetime)
    }

    /// Whether any key normalizes to the same base as `session`.
    pub fn contains(&self, session: &str) -> bool {
        let base = normalize_session_name(session);
        self.0.keys().any(|k| normalize_session_name(k) == base)
    }

    /// Whether the literal `session` key is present.
    pub fn contains_exact(&self, session: &str) -> bool {
        self.0.contains_key(session)
    }

    /// Record `at` under the literal `session` name, retiring any other keys
    /// that normalize to the same base. Returns the retired keys.
    pub fn insert(&mut self, session: &str, at: DateTime<Utc>) -> Vec<String> {
        let retired = self.remove_siblings(session);
        self.0.insert(session.to_string(), at.timestamp());
        retired
    }

    /// Record `at` only if the literal `session` has no record yet.
    ///
    /// Siblings under an older suffix are retired: a recreated session is a
    /// new start. Returns the timestamp now on record.
    pub fn insert_if_absent(&mut self, session: &str, at: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(existing) = self.0.get(session).copied().and_then(to_datetime) {
            return existing;
        }
        self.insert(session, at);
        at
    }

    /// Remove every key that normalizes to the same base as `session`.
    pub fn remove(&mut self, session: &str) -> Vec<String> {
        let base = normalize_session_name(session).to_string();
        let keys: Vec<String> = self
            .0
            .keys()
            .filter(|k| normalize_session_name(k) == base)
            .cloned()
            .collect();
        for key in &keys {
            self.0.remove(key);
        }
        keys
    }

    /// Keep only records whose key satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.0.len();
        self.0.retain(|k, _| keep(k));
        before - self.0.len()
    }

    /// All records with valid timestamps.
    pub fn entries(&self) -> Vec<(String, DateTime<Utc>)> {
        self.0
            .iter()
            .filter_map(|(k, &v)| to_datetime(v).map(|t| (k.clone(), t)))
            .collect()
    }

    fn remove_siblings(&mut self, session: &str) -> Vec<String> {
        let base = normalize_session_name(session).to_string();
        let siblings: Vec<String> = self
            .0
            .keys()
            .filter(|k| k.as_str() != session && normalize_session_name(k) == base)
            .cloned()
            .collect();
        for key in &siblings {
            self.0.remove(key);
        }
        siblings
    }

    /// Repair the map in place. Every correction is logged and reported.
    pub fn heal(&mut self, now: DateTime<Utc>, policy: &HealPolicy) -> HealReport {
        let mut report = HealReport::default();
        let substitute = now - policy.substitute_age;

        let keys: Vec<String> = self.0.keys().cloned().collect();
        for key in keys {
            let Some(&raw) = self.0.get(&key) else {
                continue;
            };
            let Some(at) = to_datetime(raw) else {
                self.0.remove(&key);
                report.actions.push(HealAction::DroppedInvalid { session: key, raw });
                continue;
            };

            if at > now {
                self.0.insert(key.clone(), substitute.timestamp());
                report.actions.push(HealAction::ClampedFuture {
                    session: key,
                    was: at,
                    now: substitute,
                });
                continue;
            }

            if let Some(staleness) = policy.staleness {
                if now - at > staleness {
                    self.0.remove(&key);
                    report.actions.push(HealAction::PrunedStale { session: key, at });
                }
            }
        }

        // Collapse keys that normalize to the same session, newest wins.
        let mut newest: BTreeMap<String, (String, i64)> = BTreeMap::new();
        let mut retired = Vec::new();
        for (key, &value) in &self.0 {
            let base = normalize_session_name(key).to_string();
            match newest.get(&base) {
                Some((kept, kept_value)) if *kept_value >= value => {
                    retired.push((key.clone(), kept.clone()));
                }
                Some((prev, _)) => {
                    retired.push((prev.clone(), key.clone()));
                    newest.insert(base, (key.clone(), value));
                }
                None => {
                    newest.insert(base, (key.clone(), value));
                }
            }
        }
        for (retired_key, kept) in retired {
            // A key retired early may itself have been recorded as a keeper.
            let kept = newest
                .get(normalize_session_name(&kept))
                .map(|(k, _)| k.clone())
                .unwrap_or(kept);
            if retired_key == kept {
                continue;
            }
            self.0.remove(&retired_key);
            report.actions.push(HealAction::MergedDuplicate {
                retired: retired_key,
                kept,
            });
        }

        for action in &report.actions {
            warn!(correction = %action, "healed timestamp record");
        }
        report
    }
}

impl FromIterator<(String, DateTime<Utc>)> for StampMap {
    fn from_iter<I: IntoIterator<Item = (String, DateTime<Utc>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k, v.timestamp())).collect())
    }
}
