//! Analysis Result Store Integration Tests
//!
//! Request scoping and selection flows:
//! - stale batch filtering across requests and sessions, including
//!   requests replaced by a newer one
//! - session switches abandoning pending requests
//! - implicit session adoption from the first batch
//! - display flags and store events

use std::sync::{Arc, Mutex};

use insight_desk::services::analysis_results::{
    AnalysisResultStore, ResultStoreEvent, ResultStoreEventKind,
};
use insight_desk_core::{
    AnalysisResultBatch, InsightData, LoadingError, MetricData, ResultData, ResultItem,
    ResultMetadata, ResultSource,
};
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

fn metric(id: &str) -> ResultItem {
    ResultItem {
        id: id.to_string(),
        data: ResultData::Metric(MetricData {
            title: "Revenue".to_string(),
            value: "1.2M".to_string(),
            change: "+4%".to_string(),
        }),
        metadata: ResultMetadata::default(),
        source: ResultSource::Realtime,
    }
}

fn chart(id: &str) -> ResultItem {
    ResultItem {
        id: id.to_string(),
        data: ResultData::Echarts(json!({"series": [{"type": "bar", "data": [1, 2, 3]}]})),
        metadata: ResultMetadata::default(),
        source: ResultSource::Realtime,
    }
}

fn batch(session: &str, message: &str, request: &str, items: Vec<ResultItem>, complete: bool) -> AnalysisResultBatch {
    AnalysisResultBatch {
        session_id: session.to_string(),
        message_id: message.to_string(),
        request_id: request.to_string(),
        items,
        is_complete: complete,
        timestamp: 1_700_000_000_000,
    }
}

fn current_ids(store: &AnalysisResultStore) -> Vec<String> {
    store.get_current_results().into_iter().map(|item| item.id).collect()
}

// ============================================================================
// Request scoping
// ============================================================================

#[test]
fn test_stale_request_is_filtered() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");
    store.set_loading(true, Some("A"), Some("m1"));
    store.set_loading(true, Some("B"), Some("m1"));

    assert!(!store.update_results(batch("s1", "m1", "A", vec![metric("from-a")], false)));
    assert!(store.update_results(batch("s1", "m1", "B", vec![metric("from-b")], false)));

    assert_eq!(current_ids(&store), vec!["from-b"]);
    assert!(store.is_loading());
}

#[test]
fn test_late_batch_of_replaced_request_cannot_overwrite() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");
    store.set_loading(true, Some("r1"), Some("m1"));
    store.set_loading(true, Some("r2"), Some("m1"));

    assert!(store.update_results(batch("s1", "m1", "r2", vec![metric("new")], true)));
    assert!(!store.is_loading());

    // r1 answers after r2 already finished
    assert!(!store.update_results(batch("s1", "m1", "r1", vec![metric("old")], true)));
    assert!(!store.update_results(batch("s1", "m2", "r1", vec![metric("old")], true)));

    assert_eq!(current_ids(&store), vec!["new"]);
    assert!(!store.has_data("s1", "m2"));
}

#[test]
fn test_partial_batches_accumulate_until_complete() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");
    store.set_loading(true, Some("r1"), Some("m1"));

    store.update_results(batch("s1", "m1", "r1", vec![metric("a")], false));
    store.update_results(batch("s1", "m1", "r1", vec![metric("a"), chart("b")], false));
    assert!(store.is_loading());

    store.update_results(batch("s1", "m1", "r1", vec![metric("c")], true));
    assert_eq!(current_ids(&store), vec!["a", "b", "c"]);
    assert!(!store.is_loading());
    assert!(store.get_pending_request_id().is_none());
}

#[test]
fn test_new_request_replaces_previous_results() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");

    store.set_loading(true, Some("r1"), Some("m1"));
    store.update_results(batch("s1", "m1", "r1", vec![metric("old")], true));
    store.set_loading(true, Some("r2"), Some("m1"));
    store.update_results(batch("s1", "m1", "r2", vec![chart("new")], true));

    assert_eq!(current_ids(&store), vec!["new"]);
}

#[test]
fn test_session_switch_abandons_pending_request() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");
    store.set_loading(true, Some("r1"), Some("m1"));

    store.switch_session("s2");
    assert!(!store.is_loading());
    assert!(store.get_pending_request_id().is_none());

    // late batch of the abandoned request
    assert!(!store.update_results(batch("s1", "m1", "r1", vec![metric("late")], true)));
    assert!(!store.has_data("s1", "m1"));
}

#[test]
fn test_batch_without_loading_creates_visible_result() {
    let mut store = AnalysisResultStore::new();

    assert!(store.update_results(batch("s1", "m1", "r1", vec![metric("m")], true)));

    assert_eq!(store.get_current_session(), Some("s1"));
    assert_eq!(store.get_current_message(), Some("m1"));
    assert_eq!(current_ids(&store), vec!["m"]);
    let item = &store.get_current_results()[0];
    assert_eq!(item.metadata.session_id, "s1");
    assert_eq!(item.metadata.message_id, "m1");
}

#[test]
fn test_cached_results_survive_message_selection() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");
    store.update_results(batch("s1", "m1", "r1", vec![metric("first")], true));
    store.update_results(batch("s1", "m2", "r2", vec![metric("second")], true));

    store.select_message("m2");
    assert_eq!(current_ids(&store), vec!["second"]);
    store.select_message("m1");
    assert_eq!(current_ids(&store), vec!["first"]);

    store.clear_results("s1");
    assert!(store.get_current_results().is_empty());
}

#[test]
fn test_error_stops_loading() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");
    store.set_loading(true, Some("r1"), Some("m1"));
    store.set_error(LoadingError::new("DATA_EMPTY", "No rows"));

    assert!(!store.is_loading());
    assert_eq!(store.get_error().map(|e| e.code.as_str()), Some("DATA_EMPTY"));

    store.set_loading(true, Some("r2"), None);
    assert!(store.get_error().is_none());
}

// ============================================================================
// Display flags
// ============================================================================

#[test]
fn test_display_flags_follow_results() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");
    store.select_message("m1");

    let flags = store.display_flags();
    assert!(!flags.has_any_analysis_results);
    assert!(flags.should_show_data_source_stats);

    store.notify_historical_empty_result("s1", "m1");
    let flags = store.display_flags();
    assert!(flags.is_viewing_historical_empty_result);
    assert!(!flags.should_show_data_source_stats);

    store.update_results(batch(
        "s1",
        "m1",
        "r1",
        vec![ResultItem {
            id: "insight".to_string(),
            data: ResultData::Insight(InsightData {
                text: "Sales peak on Fridays".to_string(),
                icon: String::new(),
                data_source_id: None,
                source_name: None,
            }),
            metadata: ResultMetadata::default(),
            source: ResultSource::Completed,
        }],
        true,
    ));
    let flags = store.display_flags();
    assert!(flags.has_any_analysis_results);
    assert!(!flags.is_viewing_historical_empty_result);
    assert!(!flags.should_show_data_source_stats);
    assert_eq!(store.buckets().insights.len(), 1);
}

// ============================================================================
// Events and subscriptions
// ============================================================================

#[test]
fn test_session_switched_emitted_once() {
    let mut store = AnalysisResultStore::new();
    let events: Arc<Mutex<Vec<ResultStoreEvent>>> = Arc::new(Mutex::new(Vec::new()));

    store.switch_session("A");
    let sink = events.clone();
    store.on(ResultStoreEventKind::SessionSwitched, move |event| {
        sink.lock().unwrap().push(event.clone());
    });
    store.switch_session("B");
    store.switch_session("B");

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![ResultStoreEvent::SessionSwitched {
            from_session_id: Some("A".to_string()),
            to_session_id: "B".to_string(),
        }]
    );
}

#[test]
fn test_analysis_started_carries_scope() {
    let mut store = AnalysisResultStore::new();
    store.switch_session("s1");
    let events: Arc<Mutex<Vec<ResultStoreEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let id = store.on(ResultStoreEventKind::AnalysisStarted, move |event| {
        sink.lock().unwrap().push(event.clone());
    });

    store.set_loading(true, Some("r1"), Some("m1"));
    assert!(store.unsubscribe(id));
    store.set_loading(true, Some("r2"), Some("m1"));

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        ResultStoreEvent::AnalysisStarted {
            session_id: Some("s1".to_string()),
            message_id: Some("m1".to_string()),
            request_id: Some("r1".to_string()),
        }
    );
}

#[test]
fn test_subscribe_delivers_snapshot_without_activity() {
    let mut store = AnalysisResultStore::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();

    store.subscribe(move |state| sink.lock().unwrap().push(state.is_loading));

    assert_eq!(*calls.lock().unwrap(), vec![false]);
}
