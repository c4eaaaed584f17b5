//! Layered wait-time estimation.
//!
//! How long has a session been sitting since it last finished work? The
//! answer comes from the first layer that has data:
//!
//! 1. a completion record (exact)
//! 2. the session's last-activity timestamp
//! 3. hints in the visible screen text
//! 4. a neutral default
//!
//! Only the first layer is exact. Fallback estimates never drop below a
//! floor, so a session with no history is never shown as "just finished".

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use sentinel_core::{Clock, StateClassifier};
use sentinel_persistence::CompletionStore;

/// Which layer produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    Record,
    Activity,
    ScreenText,
    Default,
}

impl EstimateSource {
    pub fn label(self) -> &'static str {
        match self {
            EstimateSource::Record => "record",
            EstimateSource::Activity => "activity",
            EstimateSource::ScreenText => "screen",
            EstimateSource::Default => "default",
        }
    }
}

/// Time since a session last finished work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitEstimate {
    pub elapsed: Duration,
    pub exact: bool,
    pub source: EstimateSource,
}

impl WaitEstimate {
    /// Compact human form: `42s`, `7m`, `3h12m`. Inexact estimates get a
    /// leading `~`.
    pub fn display(&self) -> String {
        let secs = self.elapsed.as_secs();
        let body = if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else {
            format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
        };
        if self.exact {
            body
        } else {
            format!("~{}", body)
        }
    }
}

/// Tunables for the fallback layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorConfig {
    /// Activity younger than this is taken at face value.
    pub recent_activity: Duration,
    /// Estimate when the screen looks freshly finished.
    pub completion_hint: Duration,
    /// Estimate when the screen looks like it has been waiting a while.
    pub waiting_hint: Duration,
    /// Estimate when nothing else is known.
    pub neutral: Duration,
    /// Lower bound for every inexact estimate.
    pub floor: Duration,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            recent_activity: Duration::from_secs(5 * 60),
            completion_hint: Duration::from_secs(450),
            waiting_hint: Duration::from_secs(30 * 60),
            neutral: Duration::from_secs(15 * 60),
            floor: Duration::from_secs(60),
        }
    }
}

/// Computes [`WaitEstimate`]s on demand.
pub struct WaitTimeEstimator {
    store: Arc<dyn CompletionStore>,
    classifier: Arc<StateClassifier>,
    clock: Arc<dyn Clock>,
    config: EstimatorConfig,
}

impl WaitTimeEstimator {
    pub fn new(
        store: Arc<dyn CompletionStore>,
        classifier: Arc<StateClassifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            classifier,
            clock,
            config: EstimatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EstimatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate how long `session` has been waiting.
    ///
    /// `activity_at` is the multiplexer's last-activity time, `tail` the
    /// last lines of the screen, oldest first.
    pub fn estimate(
        &self,
        session: &str,
        activity_at: Option<DateTime<Utc>>,
        tail: &[String],
    ) -> WaitEstimate {
        let now = self.clock.now();

        if let Some(at) = self.store.last_completion(session) {
            return WaitEstimate {
                elapsed: age(at, now),
                exact: true,
                source: EstimateSource::Record,
            };
        }

        if let Some(at) = activity_at {
            let age = age(at, now);
            let elapsed = if age < self.config.recent_activity {
                age
            } else {
                age / 2
            };
            return self.inexact(elapsed, EstimateSource::Activity);
        }

        let patterns = self.classifier.patterns();
        for line in tail.iter().rev() {
            if patterns.is_completion_hint(line) {
                return self.inexact(self.config.completion_hint, EstimateSource::ScreenText);
            }
            if patterns.is_waiting_hint(line) {
                return self.inexact(self.config.waiting_hint, EstimateSource::ScreenText);
            }
        }

        self.inexact(self.config.neutral, EstimateSource::Default)
    }

    fn inexact(&self, elapsed: Duration, source: EstimateSource) -> WaitEstimate {
        WaitEstimate {
            elapsed: elapsed.max(self.config.floor),
            exact: false,
            source,
        }
    }
}

fn age(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - at).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use sentinel_core::ManualClock;
    use sentinel_persistence::MemoryCompletionStore;

    fn setup() -> (Arc<MemoryCompletionStore>, ManualClock, WaitTimeEstimator) {
        let store = Arc::new(MemoryCompletionStore::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let estimator = WaitTimeEstimator::new(
            store.clone(),
            Arc::new(StateClassifier::default()),
            Arc::new(clock.clone()),
        );
        (store, clock, estimator)
    }

    #[test]
    fn test_record_is_exact() {
        let (store, clock, estimator) = setup();
        store
            .mark_completion("api", clock.now() - ChronoDuration::seconds(90))
            .unwrap();

        let est = estimator.estimate("api", None, &[]);
        assert_eq!(est.elapsed, Duration::from_secs(90));
        assert!(est.exact);
        assert_eq!(est.source, EstimateSource::Record);
    }

    #[test]
    fn test_record_under_recreated_name() {
        let (store, clock, estimator) = setup();
        store
            .mark_completion("proj-8", clock.now() - ChronoDuration::seconds(30))
            .unwrap();

        let est = estimator.estimate("proj-29", None, &[]);
        assert!(est.exact);
        assert_eq!(est.elapsed, Duration::from_secs(30));
    }

    #[test]
    fn test_recent_activity_taken_as_is() {
        let (_store, clock, estimator) = setup();
        let est = estimator.estimate("api", Some(clock.now() - ChronoDuration::seconds(120)), &[]);
        assert_eq!(est.elapsed, Duration::from_secs(120));
        assert!(!est.exact);
        assert_eq!(est.source, EstimateSource::Activity);
    }

    #[test]
    fn test_old_activity_is_halved() {
        let (_store, clock, estimator) = setup();
        let est = estimator.estimate("api", Some(clock.now() - ChronoDuration::minutes(40)), &[]);
        assert_eq!(est.elapsed, Duration::from_secs(20 * 60));
    }

    #[test]
    fn test_fallbacks_respect_floor() {
        let (_store, clock, estimator) = setup();
        let est = estimator.estimate("api", Some(clock.now() - ChronoDuration::seconds(5)), &[]);
        assert_eq!(est.elapsed, Duration::from_secs(60));

        // Activity reported in the future never yields a negative age.
        let est = estimator.estimate("api", Some(clock.now() + ChronoDuration::minutes(3)), &[]);
        assert_eq!(est.elapsed, Duration::from_secs(60));
    }

    #[test]
    fn test_screen_hints_bottom_up() {
        let (_store, _clock, estimator) = setup();
        let tail = vec![
            "Do you want to continue?".to_string(),
            "Build finished".to_string(),
            ">".to_string(),
        ];
        let est = estimator.estimate("api", None, &tail);
        assert_eq!(est.elapsed, Duration::from_secs(450));
        assert_eq!(est.source, EstimateSource::ScreenText);

        let tail = vec!["waiting for approval".to_string(), ">".to_string()];
        let est = estimator.estimate("api", None, &tail);
        assert_eq!(est.elapsed, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_neutral_default() {
        let (_store, _clock, estimator) = setup();
        let est = estimator.estimate("api", None, &["$".to_string()]);
        assert_eq!(est.elapsed, Duration::from_secs(15 * 60));
        assert_eq!(est.source, EstimateSource::Default);
        assert!(!est.exact);
    }

    #[test]
    fn test_display() {
        let est = WaitEstimate {
            elapsed: Duration::from_secs(3 * 3600 + 12 * 60),
            exact: false,
            source: EstimateSource::Activity,
        };
        assert_eq!(est.display(), "~3h12m");

        let est = WaitEstimate {
            elapsed: Duration::from_secs(42),
            exact: true,
            source: EstimateSource::Record,
        };
        assert_eq!(est.display(), "42s");
    }
}
