//! Session Loading Registry Integration Tests
//!
//! Full loading lifecycles driven by a manual clock:
//! - progress, completion and the deferred clear
//! - inactivity timeout recovery
//! - errors surviving stop requests
//! - subscription snapshots and change notifications

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use insight_desk::services::loading::{LoadingRegistryConfig, LoadingTimer, SessionLoadingRegistry};
use insight_desk_core::{LoadingError, ManualClock, ProgressInfo, ProgressStage};

// ============================================================================
// Helpers
// ============================================================================

fn create_registry() -> (Arc<ManualClock>, SessionLoadingRegistry) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let registry = SessionLoadingRegistry::new(LoadingRegistryConfig::default(), clock.clone());
    (clock, registry)
}

fn analyzing(percent: i64) -> ProgressInfo {
    ProgressInfo::new("analyzing", percent, "Running analysis", 2, 4)
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_progress_scenario() {
    let (_clock, mut registry) = create_registry();

    registry.set_loading("s1", true);
    registry.update_progress("s1", analyzing(50));

    assert!(registry.is_loading("s1"));
    let progress = registry.get_progress("s1").unwrap();
    assert_eq!(progress.progress, 50);
    assert_eq!(progress.stage, ProgressStage::Analyzing);
}

#[test]
fn test_completion_clears_after_delay() {
    let (clock, mut registry) = create_registry();

    registry.set_loading("s1", true);
    registry.update_progress("s1", analyzing(80));
    assert!(registry.complete("s1"));

    // still visible at 100% until the completion delay passes
    assert_eq!(registry.get_progress("s1").unwrap().progress, 100);
    assert!(registry.has_pending_timer("s1", LoadingTimer::DeferredClear));

    clock.advance(Duration::from_millis(299));
    registry.fire_due_timers();
    assert!(registry.get_session_state("s1").is_some());

    clock.advance(Duration::from_millis(1));
    registry.fire_due_timers();
    assert!(registry.get_session_state("s1").is_none());
    assert!(!registry.is_loading("s1"));
}

#[test]
fn test_new_request_cancels_deferred_clear() {
    let (clock, mut registry) = create_registry();

    registry.set_loading("s1", true);
    registry.set_loading("s1", false);
    assert!(registry.has_pending_timer("s1", LoadingTimer::StopClear));

    clock.advance(Duration::from_millis(50));
    registry.set_loading("s1", true);
    assert!(!registry.has_pending_timer("s1", LoadingTimer::StopClear));

    clock.advance(Duration::from_millis(500));
    registry.fire_due_timers();
    assert!(registry.is_loading("s1"));
}

#[test]
fn test_timeout_recovers_stuck_session() {
    let (clock, mut registry) = create_registry();

    registry.set_loading("s1", true);
    clock.advance(Duration::from_secs(9 * 60));
    registry.update_progress("s1", analyzing(10));

    // activity re-armed the timeout
    clock.advance(Duration::from_secs(9 * 60));
    registry.fire_due_timers();
    assert!(registry.is_loading("s1"));

    clock.advance(Duration::from_secs(60));
    registry.fire_due_timers();
    assert!(!registry.is_loading("s1"));
    assert!(registry.get_session_state("s1").is_none());
}

#[test]
fn test_short_timeout_from_config() {
    let clock = Arc::new(ManualClock::new(0));
    let config = LoadingRegistryConfig {
        timeout: Duration::from_secs(120),
        ..LoadingRegistryConfig::default()
    };
    let mut registry = SessionLoadingRegistry::new(config, clock.clone());

    registry.set_loading("s1", true);
    assert_eq!(registry.next_deadline(), Some(120_000));

    clock.advance(Duration::from_secs(120));
    assert_eq!(registry.fire_due_timers(), 1);
    assert!(!registry.is_loading("s1"));
}

#[test]
fn test_error_survives_stop_and_timers() {
    let (clock, mut registry) = create_registry();

    registry.set_loading("s1", true);
    registry.set_error("s1", LoadingError::new("PYTHON_SYNTAX", "Code syntax error"));
    registry.set_loading("s1", false);

    clock.advance(Duration::from_secs(3600));
    registry.fire_due_timers();

    let state = registry.get_session_state("s1").unwrap();
    assert!(!state.is_loading);
    assert_eq!(state.error.unwrap().code, "PYTHON_SYNTAX");

    registry.clear_error("s1");
    assert!(registry.get_session_state("s1").is_none());
}

#[test]
fn test_sessions_are_independent() {
    let (clock, mut registry) = create_registry();

    registry.set_loading("a", true);
    registry.set_loading("b", true);
    registry.cancel("a");
    registry.update_progress("b", analyzing(30));

    assert_eq!(registry.get_loading_session_ids(), ids(&["b"]));

    clock.advance(Duration::from_secs(1));
    registry.fire_due_timers();
    assert!(registry.is_loading("b"));
}

// ============================================================================
// Subscriptions
// ============================================================================

#[test]
fn test_global_subscription_sees_set_changes_only() {
    let (clock, mut registry) = create_registry();
    let seen: Arc<Mutex<Vec<BTreeSet<String>>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    registry.subscribe(move |set| sink.lock().unwrap().push(set.clone()));

    registry.set_loading("s1", true);
    registry.update_progress("s1", analyzing(40));
    registry.set_loading("s1", false);
    clock.advance(Duration::from_millis(100));
    registry.fire_due_timers();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec![ids(&[]), ids(&["s1"]), ids(&[])]);
}

#[test]
fn test_session_subscription_receives_snapshot_and_removal() {
    let (_clock, mut registry) = create_registry();
    registry.set_loading("s1", true);

    let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let id = registry.subscribe_to_session("s1", move |state| {
        sink.lock().unwrap().push(state.is_some());
    });

    registry.cancel("s1");
    assert!(registry.unsubscribe(id));
    registry.set_loading("s1", true);

    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}

#[test]
fn test_panicking_listener_does_not_block_others() {
    let (_clock, mut registry) = create_registry();
    let calls = Arc::new(Mutex::new(0));

    registry.subscribe(|set| {
        if !set.is_empty() {
            panic!("listener failure");
        }
    });
    let counter = calls.clone();
    registry.subscribe(move |_| *counter.lock().unwrap() += 1);

    registry.set_loading("s1", true);
    assert_eq!(*calls.lock().unwrap(), 2);
    assert!(registry.is_loading("s1"));
}
