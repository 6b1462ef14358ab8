//! Property Tests
//!
//! Random operation sequences against both managers, checking after every
//! step that:
//! - analysis results and the data-source statistics panel never show together
//! - a request replaced by a newer one never writes results again
//! - an errored state is never loading

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use insight_desk::services::analysis_results::AnalysisResultStore;
use insight_desk::services::loading::{LoadingRegistryConfig, SessionLoadingRegistry};
use insight_desk_core::{
    AnalysisResultBatch, LoadingError, ManualClock, MetricData, ProgressInfo, ResultData,
    ResultItem, ResultMetadata, ResultSource,
};
use proptest::prelude::*;

// -- Strategy helpers --

fn arb_session() -> impl Strategy<Value = String> {
    prop_oneof![Just("a".to_string()), Just("b".to_string())]
}

fn arb_message() -> impl Strategy<Value = String> {
    prop_oneof![Just("m1".to_string()), Just("m2".to_string())]
}

fn arb_request() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("r1".to_string()),
        Just("r2".to_string()),
        Just("r3".to_string()),
    ]
}

#[derive(Debug, Clone)]
enum StoreOp {
    Switch(String),
    Select(String),
    Start(String, String),
    Stop,
    Finish(String),
    Batch {
        session: String,
        message: String,
        request: String,
        items: usize,
        complete: bool,
    },
    HistoricalEmpty(String, String),
    Error,
    ClearError,
    ClearResults(String),
    ClearAll,
}

fn arb_store_op() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        arb_session().prop_map(StoreOp::Switch),
        arb_message().prop_map(StoreOp::Select),
        (arb_request(), arb_message()).prop_map(|(r, m)| StoreOp::Start(r, m)),
        prop_oneof![
            Just(StoreOp::Stop),
            Just(StoreOp::Error),
            Just(StoreOp::ClearError),
            Just(StoreOp::ClearAll),
        ],
        arb_request().prop_map(StoreOp::Finish),
        (arb_session(), arb_message(), arb_request(), 0usize..3, any::<bool>()).prop_map(
            |(session, message, request, items, complete)| StoreOp::Batch {
                session,
                message,
                request,
                items,
                complete,
            }
        ),
        (arb_session(), arb_message()).prop_map(|(s, m)| StoreOp::HistoricalEmpty(s, m)),
        arb_session().prop_map(StoreOp::ClearResults),
    ]
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn item_id(step: usize, index: usize) -> String {
    format!("{}-{}", step, index)
}

/// Apply `op`; returns whether a batch was accepted (`true` for other ops).
fn apply_store_op(store: &mut AnalysisResultStore, op: StoreOp, step: usize) -> bool {
    match op {
        StoreOp::Switch(session) => store.switch_session(&session),
        StoreOp::Select(message) => store.select_message(&message),
        StoreOp::Start(request, message) => {
            store.set_loading(true, non_empty(&request), Some(&message))
        }
        StoreOp::Stop => store.set_loading(false, None, None),
        StoreOp::Finish(request) => {
            store.finish_request(non_empty(&request));
        }
        StoreOp::Batch {
            session,
            message,
            request,
            items,
            complete,
        } => {
            let items = (0..items)
                .map(|i| ResultItem {
                    id: item_id(step, i),
                    data: ResultData::Metric(MetricData {
                        title: "t".to_string(),
                        value: i.to_string(),
                        change: String::new(),
                    }),
                    metadata: ResultMetadata::default(),
                    source: ResultSource::Realtime,
                })
                .collect();
            return store.update_results(AnalysisResultBatch {
                session_id: session,
                message_id: message,
                request_id: request,
                items,
                is_complete: complete,
                timestamp: step as i64,
            });
        }
        StoreOp::HistoricalEmpty(session, message) => {
            store.notify_historical_empty_result(&session, &message)
        }
        StoreOp::Error => store.set_error(LoadingError::new("ANALYSIS_ERROR", "failed")),
        StoreOp::ClearError => store.clear_error(),
        StoreOp::ClearResults(session) => store.clear_results(&session),
        StoreOp::ClearAll => store.clear_all(),
    }
    true
}

/// Request ids that were pending when a different request started or the
/// session changed, and have not been restarted since.
#[derive(Default)]
struct ReplacedRequests(HashSet<String>);

impl ReplacedRequests {
    fn before(&mut self, store: &AnalysisResultStore, op: &StoreOp) {
        let outgoing = store.get_pending_request_id().map(str::to_string);
        match op {
            StoreOp::Start(request, _) => {
                if let Some(outgoing) = outgoing.filter(|id| id != request) {
                    self.0.insert(outgoing);
                }
                self.0.remove(request);
            }
            StoreOp::Switch(session) if store.get_current_session() != Some(session.as_str()) => {
                self.0.extend(outgoing);
            }
            StoreOp::ClearAll => self.0.clear(),
            _ => {}
        }
    }

    fn contains(&self, request: &str) -> bool {
        !request.is_empty() && self.0.contains(request)
    }
}

#[derive(Debug, Clone)]
enum RegistryOp {
    Start(String),
    Stop(String),
    Progress(String, i64),
    Complete(String),
    Fail(String),
    ClearError(String),
    Cancel(String),
    Advance(u64),
}

fn arb_registry_op() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        arb_session().prop_map(RegistryOp::Start),
        arb_session().prop_map(RegistryOp::Stop),
        (arb_session(), 0i64..=100).prop_map(|(s, p)| RegistryOp::Progress(s, p)),
        arb_session().prop_map(RegistryOp::Complete),
        arb_session().prop_map(RegistryOp::Fail),
        arb_session().prop_map(RegistryOp::ClearError),
        arb_session().prop_map(RegistryOp::Cancel),
        prop_oneof![Just(50u64), Just(150), Just(400), Just(700_000)].prop_map(RegistryOp::Advance),
    ]
}

fn apply_registry_op(registry: &mut SessionLoadingRegistry, clock: &ManualClock, op: RegistryOp) {
    match op {
        RegistryOp::Start(s) => registry.set_loading(&s, true),
        RegistryOp::Stop(s) => registry.set_loading(&s, false),
        RegistryOp::Progress(s, p) => {
            registry.update_progress(&s, ProgressInfo::new("analyzing", p, "", 1, 2))
        }
        RegistryOp::Complete(s) => {
            registry.complete(&s);
        }
        RegistryOp::Fail(s) => registry.set_error(&s, LoadingError::new("DATA_INVALID", "bad data")),
        RegistryOp::ClearError(s) => registry.clear_error(&s),
        RegistryOp::Cancel(s) => registry.cancel(&s),
        RegistryOp::Advance(ms) => {
            clock.advance(Duration::from_millis(ms));
            registry.fire_due_timers();
        }
    }
}

proptest! {
    #[test]
    fn results_and_data_source_stats_are_exclusive(ops in prop::collection::vec(arb_store_op(), 1..40)) {
        let mut store = AnalysisResultStore::new();
        for (step, op) in ops.into_iter().enumerate() {
            apply_store_op(&mut store, op, step);
            let flags = store.display_flags();
            prop_assert!(!(flags.has_any_analysis_results && flags.should_show_data_source_stats));
            prop_assert_eq!(flags.has_any_analysis_results, store.has_current_data());
        }
    }

    #[test]
    fn superseded_requests_never_write(ops in prop::collection::vec(arb_store_op(), 1..60)) {
        let mut store = AnalysisResultStore::new();
        let mut replaced = ReplacedRequests::default();
        let mut origin: HashMap<String, String> = HashMap::new();

        for (step, op) in ops.into_iter().enumerate() {
            replaced.before(&store, &op);
            let batch = match &op {
                StoreOp::Batch { session, message, request, items, .. } => {
                    Some((session.clone(), message.clone(), request.clone(), *items))
                }
                _ => None,
            };

            let accepted = apply_store_op(&mut store, op, step);
            let Some((session, message, request, items)) = batch else {
                continue;
            };
            if replaced.contains(&request) {
                prop_assert!(!accepted, "late batch of replaced request {} accepted", request);
            }
            if !accepted {
                continue;
            }

            for index in 0..items {
                origin.insert(item_id(step, index), request.clone());
            }
            let state = store.get_state();
            let stored = state
                .results_by_session_and_message
                .get(&session)
                .and_then(|messages| messages.get(&message))
                .cloned()
                .unwrap_or_default();
            for item in stored {
                prop_assert_eq!(origin.get(&item.id), Some(&request));
            }
        }
    }

    #[test]
    fn errored_store_is_never_loading(ops in prop::collection::vec(arb_store_op(), 1..40)) {
        let mut store = AnalysisResultStore::new();
        for (step, op) in ops.into_iter().enumerate() {
            apply_store_op(&mut store, op, step);
            prop_assert!(store.get_error().is_none() || !store.is_loading());
        }
    }

    #[test]
    fn errored_session_is_never_loading(ops in prop::collection::vec(arb_registry_op(), 1..40)) {
        let clock = Arc::new(ManualClock::new(0));
        let mut registry = SessionLoadingRegistry::new(LoadingRegistryConfig::default(), clock.clone());
        for op in ops {
            apply_registry_op(&mut registry, &clock, op);
            for state in registry.sessions() {
                prop_assert!(state.error.is_none() || !state.is_loading, "{:?}", state);
            }
        }
    }
}
