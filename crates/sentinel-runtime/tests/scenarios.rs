//! End-to-end notification scenarios driven through `Runtime::poll_once`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use common::{drain, start_time, Harness, IDLE, WAITING, WORKING};
use sentinel_core::{Clock, SessionState};
use sentinel_persistence::{CompletionStore, EventLog, MemoryCompletionStore};
use sentinel_runtime::{
    NotificationKind, RuntimeConfig, RuntimeEvent, StateTransition, Suppression,
};

#[tokio::test]
async fn working_indicator_above_prompt_stays_working() {
    let mut h = Harness::new();
    h.source.show("api", WORKING);

    h.tick_after(0).await;
    h.tick_after(5).await;
    h.tick_after(5).await;

    let status = h.runtime.status();
    assert!(status.is_working("api").await);
    assert!(h.sink.delivered().is_empty());
    assert!(h.store.last_completion("api").is_none());
}

#[tokio::test]
async fn quiet_completion_sends_exactly_one_notification() {
    let mut h = Harness::new();
    h.source.show("api", IDLE);

    h.tick_after(0).await;
    assert!(h.sink.delivered().is_empty());

    h.tick_after(5).await;
    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].starts_with("✅ Session \"api\" finished work"));
    assert_eq!(h.store.last_completion("api"), Some(h.clock.now()));

    h.tick_after(5).await;
    h.tick_after(5).await;
    assert_eq!(h.sink.delivered().len(), 1);
}

#[tokio::test]
async fn repeated_waiting_notifies_once() {
    let mut h = Harness::new();
    h.source.show("api", WAITING);

    h.tick_after(0).await;
    h.tick_after(1).await;

    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].starts_with("❓ Session \"api\" is waiting for input"));
}

#[tokio::test]
async fn waiting_again_within_cooldown_is_suppressed() {
    let mut h = Harness::new();
    let mut events = h.runtime.subscribe();

    h.source.show("api", WAITING);
    h.tick_after(0).await;
    h.source.show("api", IDLE);
    h.tick_after(1).await;
    h.source.show("api", "Do you want to proceed? [y/n]");
    let report = h.tick_after(1).await;

    assert_eq!(report.suppressed, 1);
    assert_eq!(h.sink.delivered().len(), 1);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        RuntimeEvent::Suppressed {
            kind: NotificationKind::WaitingInput,
            reason: Suppression::Cooldown,
            ..
        }
    )));
}

#[tokio::test]
async fn failed_delivery_still_records_completion() {
    let mut h = Harness::new();
    let mut events = h.runtime.subscribe();

    h.source.show("api", WORKING);
    h.tick_after(0).await;

    h.sink.set_failing(true);
    h.source.show("api", IDLE);
    let report = h.tick_after(5).await;

    assert_eq!(report.delivery_failures, 1);
    assert!(h.sink.delivered().is_empty());
    assert_eq!(h.store.last_completion("api"), Some(h.clock.now()));

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(e, RuntimeEvent::CompletionRecorded { .. })));
    assert!(events.iter().any(RuntimeEvent::is_error));
}

#[tokio::test]
async fn working_to_waiting_sends_one_waiting_notification() {
    let mut h = Harness::new();
    h.source.show("api", WORKING);
    h.tick_after(0).await;

    h.source.show("api", WAITING);
    h.tick_after(5).await;

    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].starts_with("❓"));
    // The completion is recorded even though the notification is about input.
    assert_eq!(h.store.last_completion("api"), Some(h.clock.now()));
}

#[tokio::test]
async fn capture_failure_is_unknown_without_transition() {
    let mut h = Harness::new();
    let mut events = h.runtime.subscribe();
    h.source.show("api", WORKING);
    h.tick_after(0).await;
    drain(&mut events);

    h.source.fail_capture("api");
    let report = h.tick_after(5).await;
    assert_eq!(report.capture_failures, 1);
    assert_eq!(report.transitions, 0);

    let view = h.runtime.status().session("api").await.unwrap();
    assert_eq!(view.state, SessionState::Unknown);
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, RuntimeEvent::StateChanged(_))));

    // Recovery resumes from the remembered Working state.
    h.source.show("api", IDLE);
    h.tick_after(5).await;
    assert_eq!(h.sink.delivered().len(), 1);
}

#[tokio::test]
async fn recreated_session_inherits_completion_record() {
    let mut h = Harness::new();
    h.source.show("proj-8", WORKING);
    h.tick_after(0).await;
    h.source.show("proj-8", IDLE);
    h.tick_after(5).await;
    let finished_at = h.clock.now();

    h.source.remove("proj-8");
    h.source.show("proj-29", "fresh shell\n$");
    h.tick_after(120).await;
    h.tick_after(5).await;
    h.tick_after(5).await;

    let estimate = h.runtime.status().estimate("proj-29").await;
    assert!(estimate.exact);
    assert_eq!(estimate.elapsed, Duration::from_secs(130));
    assert_eq!(h.store.last_completion("proj-29"), Some(finished_at));
    // Only the original completion was announced.
    assert_eq!(h.sink.delivered().len(), 1);
}

#[tokio::test]
async fn restart_keeps_completion_record_of_idle_session() {
    let store = Arc::new(MemoryCompletionStore::new());
    let finished_at = start_time() - ChronoDuration::hours(2);
    store.mark_completion("api", finished_at).unwrap();

    let mut h = Harness::with_store(RuntimeConfig::default(), store);
    h.source.show("api", IDLE);
    h.tick_after(5).await;
    h.tick_after(5).await;
    h.tick_after(5).await;

    assert!(h.sink.delivered().is_empty());
    assert_eq!(h.store.last_completion("api"), Some(finished_at));
    let estimate = h.runtime.status().estimate("api").await;
    assert!(estimate.exact);
    assert_eq!(estimate.elapsed, Duration::from_secs(2 * 3600 + 15));

    // The next real episode is still reported.
    h.source.show("api", WORKING);
    h.tick_after(5).await;
    h.source.show("api", IDLE);
    h.tick_after(5).await;
    assert_eq!(h.sink.delivered().len(), 1);
    assert_eq!(h.store.last_completion("api"), Some(h.clock.now()));
}

#[tokio::test]
async fn command_without_working_indicator_completes_again() {
    let mut h = Harness::new();
    h.source.show("api", IDLE);
    h.tick_after(0).await;
    h.tick_after(5).await;
    assert_eq!(h.sink.delivered().len(), 1);

    h.source.show("api", "applying 001\napplying 002\napplying 003");
    h.tick_after(60).await;
    h.source.show("api", "applying 003\nmigrated ok\n$");
    h.tick_after(5).await;
    h.tick_after(5).await;
    let settled_at = h.clock.now();
    h.tick_after(5).await;

    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert!(delivered[1].starts_with("✅ Session \"api\" finished work"));
    assert_eq!(h.store.last_completion("api"), Some(settled_at));
}

#[tokio::test]
async fn vanished_sessions_are_dropped() {
    let mut h = Harness::new();
    let mut events = h.runtime.subscribe();
    h.source.show("a", IDLE);
    h.source.show("b", IDLE);
    h.tick_after(0).await;

    h.source.remove("b");
    h.tick_after(5).await;

    let names: Vec<String> = h
        .runtime
        .status()
        .list_sessions()
        .await
        .into_iter()
        .map(|s| s.view.name)
        .collect();
    assert_eq!(names, vec!["a".to_string()]);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, RuntimeEvent::SessionVanished { session } if session == "b")));
}

#[tokio::test]
async fn prefix_filter_and_display_name() {
    let config = RuntimeConfig::new().with_session_prefix("claude-");
    let mut h = Harness::with_config(config);
    h.source.show("claude-api", WORKING);
    h.source.show("scratch", WORKING);
    h.tick_after(0).await;

    h.source.show("claude-api", IDLE);
    h.source.show("scratch", IDLE);
    let report = h.tick_after(5).await;

    assert_eq!(report.sessions, 1);
    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("Session \"api\""));
    assert!(h.store.last_completion("scratch").is_none());
}

#[tokio::test]
async fn future_record_is_healed_on_first_tick() {
    let store = Arc::new(MemoryCompletionStore::new());
    store.seed([
        ("api".to_string(), start_time() + ChronoDuration::hours(3)),
        ("old".to_string(), start_time() - ChronoDuration::days(10)),
    ]);
    let mut h = Harness::with_store(RuntimeConfig::default(), store);
    let mut events = h.runtime.subscribe();

    h.tick_after(0).await;

    let healed = drain(&mut events)
        .into_iter()
        .find_map(|e| match e {
            RuntimeEvent::Healed { corrections } => Some(corrections),
            _ => None,
        });
    assert_eq!(healed, Some(2));
    assert_eq!(
        h.store.last_completion("api"),
        Some(start_time() - ChronoDuration::minutes(15))
    );
    assert!(h.store.last_completion("old").is_none());

    let estimate = h.runtime.status().estimate("api").await;
    assert!(estimate.exact);
    assert_eq!(estimate.elapsed, Duration::from_secs(15 * 60));
}

#[tokio::test]
async fn transitions_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(EventLog::new(dir.path().join("transitions.jsonl")));
    let source = Arc::new(common::ScriptedSource::new());
    let clock = sentinel_core::ManualClock::new(start_time());
    let mut runtime = sentinel_runtime::Runtime::builder(
        source.clone(),
        Arc::new(sentinel_runtime::NullSink),
    )
    .with_clock(Arc::new(clock.clone()))
    .with_event_log(log.clone())
    .build();

    source.show("api", WORKING);
    runtime.poll_once().await.unwrap();
    clock.advance(ChronoDuration::seconds(5));
    source.show("api", IDLE);
    runtime.poll_once().await.unwrap();

    let logged: Vec<StateTransition> = log.read_all().unwrap();
    let pairs: Vec<(SessionState, SessionState)> = logged.iter().map(|t| (t.from, t.to)).collect();
    assert_eq!(
        pairs,
        vec![
            (SessionState::Unknown, SessionState::Working),
            (SessionState::Working, SessionState::Idle),
        ]
    );
}

#[tokio::test]
async fn dashboard_is_pinned_then_edited() {
    let config = RuntimeConfig::new().with_dashboard(true);
    let mut h = Harness::with_config(config);
    h.source.show("api", WORKING);
    h.source.show("web", WAITING);

    h.tick_after(0).await;
    let delivered = h.sink.delivered();
    let dashboard = delivered
        .iter()
        .find(|m| m.starts_with("📋"))
        .expect("dashboard sent");
    assert!(dashboard.find("web").unwrap() < dashboard.find("api").unwrap());
    assert_eq!(h.sink.pins(), 1);

    // Within the refresh interval nothing is edited.
    h.source.show("api", IDLE);
    h.tick_after(5).await;
    assert!(h.sink.edits().is_empty());

    h.tick_after(60).await;
    let edits = h.sink.edits();
    assert_eq!(edits.len(), 1);
    assert!(edits[0].contains("api · idle"));
    assert_eq!(h.sink.pins(), 1);
}
