//! Analysis Result Store
//!
//! Session/message-scoped cache of result items. Only the batch of the
//! pending request is accepted, so a late response from an abandoned or
//! superseded request can never overwrite what the user is looking at.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use insight_desk_core::{AnalysisResultBatch, LoadingError, ResultItem};

use super::display::{DisplayFlags, ResultBuckets};
use super::events::{ResultStoreEvent, ResultStoreEventKind};
use super::state::{AnalysisResultState, HistoricalEmptyMarker, PendingRequest};
use crate::services::listeners::{ListenerSet, SubscriptionId, SubscriptionIds};

const LOG: &str = "ResultStore";

/// Invalidated request ids remembered before the oldest is forgotten
const MAX_INVALIDATED_REQUESTS: usize = 256;

type ResultKey = (String, String);

/// Request ids whose late batches are refused, oldest first.
#[derive(Debug, Default)]
struct InvalidatedRequests {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl InvalidatedRequests {
    fn insert(&mut self, request_id: String) {
        if !self.ids.insert(request_id.clone()) {
            return;
        }
        self.order.push_back(request_id);
        while self.order.len() > MAX_INVALIDATED_REQUESTS {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, request_id: &str) {
        if self.ids.remove(request_id) {
            self.order.retain(|id| id != request_id);
        }
    }

    fn contains(&self, request_id: &str) -> bool {
        self.ids.contains(request_id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.order.clear();
    }
}

#[derive(Default)]
pub struct AnalysisResultStore {
    current_session_id: Option<String>,
    current_message_id: Option<String>,
    pending: Option<PendingRequest>,
    is_loading: bool,
    error: Option<LoadingError>,
    historical_empty: Option<HistoricalEmptyMarker>,
    results: BTreeMap<String, BTreeMap<String, Vec<ResultItem>>>,
    /// Request that last wrote each `(session, message)` key
    request_of_key: HashMap<ResultKey, String>,
    /// Requests abandoned by a session switch or superseded by a newer start
    invalidated_requests: InvalidatedRequests,
    ids: SubscriptionIds,
    state_listeners: ListenerSet<AnalysisResultState>,
    event_listeners: HashMap<ResultStoreEventKind, ListenerSet<ResultStoreEvent>>,
    subscription_kinds: HashMap<SubscriptionId, ResultStoreEventKind>,
}

impl std::fmt::Debug for AnalysisResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisResultStore")
            .field("current_session_id", &self.current_session_id)
            .field("current_message_id", &self.current_message_id)
            .field("pending", &self.pending)
            .field("is_loading", &self.is_loading)
            .field("sessions", &self.results.len())
            .field("state_listeners", &self.state_listeners.len())
            .field("event_listeners", &self.subscription_kinds.len())
            .finish()
    }
}

impl AnalysisResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Make `session_id` current. Resets the message selection and abandons
    /// the pending request. Switching to the current session does nothing.
    pub fn switch_session(&mut self, session_id: &str) {
        if self.current_session_id.as_deref() == Some(session_id) {
            tracing::debug!("[{}] Already on session {}", LOG, session_id);
            return;
        }

        let from = self.current_session_id.replace(session_id.to_string());
        self.current_message_id = None;
        if let Some(request_id) = self.pending.take().and_then(|p| p.request_id) {
            tracing::debug!("[{}] Abandoning request {}", LOG, request_id);
            self.invalidated_requests.insert(request_id);
        }
        self.is_loading = false;
        self.error = None;
        self.historical_empty = None;

        tracing::info!(
            "[{}] Switched session {} -> {}",
            LOG,
            from.as_deref().unwrap_or("<none>"),
            session_id
        );
        self.emit(ResultStoreEvent::SessionSwitched {
            from_session_id: from,
            to_session_id: session_id.to_string(),
        });
        self.notify_state();
    }

    /// Select a message of the current session. Cached results of other
    /// messages are kept.
    pub fn select_message(&mut self, message_id: &str) {
        if self.current_message_id.as_deref() == Some(message_id) {
            return;
        }
        let from = self.current_message_id.replace(message_id.to_string());
        tracing::debug!("[{}] Selected message {}", LOG, message_id);
        self.emit(ResultStoreEvent::MessageSelected {
            session_id: self.current_session_id.clone(),
            from_message_id: from,
            to_message_id: message_id.to_string(),
        });
        self.notify_state();
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Start (`true`) or stop (`false`) waiting for a request.
    ///
    /// Starting records the request with the current session and the given
    /// (or current) message as its scope. A different request that was still
    /// pending is superseded and its later batches are refused.
    pub fn set_loading(&mut self, loading: bool, request_id: Option<&str>, message_id: Option<&str>) {
        if !loading {
            self.pending = None;
            self.is_loading = false;
            self.notify_state();
            return;
        }

        if let Some(message_id) = message_id {
            self.current_message_id = Some(message_id.to_string());
        }
        let outgoing = self.pending.take().and_then(|p| p.request_id);
        if let Some(outgoing) = outgoing.filter(|id| Some(id.as_str()) != request_id) {
            tracing::debug!("[{}] Request {} superseded", LOG, outgoing);
            self.invalidated_requests.insert(outgoing);
        }
        if let Some(request_id) = request_id {
            self.invalidated_requests.remove(request_id);
        }
        self.pending = Some(PendingRequest {
            session_id: self.current_session_id.clone(),
            message_id: self.current_message_id.clone(),
            request_id: request_id.map(str::to_string),
        });
        self.is_loading = true;
        self.error = None;
        self.historical_empty = None;

        tracing::debug!(
            "[{}] Awaiting request {} for {:?}/{:?}",
            LOG,
            request_id.unwrap_or("<any>"),
            self.current_session_id,
            self.current_message_id
        );
        self.emit(ResultStoreEvent::AnalysisStarted {
            session_id: self.current_session_id.clone(),
            message_id: self.current_message_id.clone(),
            request_id: request_id.map(str::to_string),
        });
        self.notify_state();
    }

    /// End loading if `request_id` is the pending one (or either side has no
    /// id). Returns whether loading ended.
    pub fn finish_request(&mut self, request_id: Option<&str>) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };
        let matches = match (pending.request_id.as_deref(), request_id) {
            (Some(pending), Some(finished)) => pending == finished,
            _ => true,
        };
        if matches {
            self.set_loading(false, None, None);
        }
        matches
    }

    /// Merge a result batch. Returns `false` when it was dropped as stale.
    pub fn update_results(&mut self, batch: AnalysisResultBatch) -> bool {
        if !self.accepts(&batch) {
            tracing::debug!(
                "[{}] Dropped stale batch {} for {}/{} ({} items)",
                LOG,
                batch.request_id,
                batch.session_id,
                batch.message_id,
                batch.items.len()
            );
            return false;
        }

        if self.current_session_id.is_none() {
            tracing::debug!("[{}] Adopting session {} from batch", LOG, batch.session_id);
            self.current_session_id = Some(batch.session_id.clone());
        }
        if self.current_message_id.is_none()
            && self.current_session_id.as_deref() == Some(batch.session_id.as_str())
        {
            let adopted = self
                .pending
                .as_ref()
                .and_then(|p| p.message_id.clone())
                .or_else(|| Some(batch.message_id.clone()).filter(|m| !m.is_empty()));
            self.current_message_id = adopted;
        }

        let AnalysisResultBatch {
            session_id,
            message_id,
            request_id,
            items,
            is_complete,
            ..
        } = batch;
        let received = items.len();
        let key = (session_id.clone(), message_id.clone());
        let same_request = self.request_of_key.get(&key) == Some(&request_id);

        let slot = self
            .results
            .entry(session_id.clone())
            .or_default()
            .entry(message_id.clone())
            .or_default();
        if !same_request {
            slot.clear();
        }
        let mut seen: HashSet<String> = slot.iter().map(|item| item.id.clone()).collect();
        for mut item in items {
            if !seen.insert(item.id.clone()) {
                continue;
            }
            if item.metadata.session_id.is_empty() {
                item.metadata.session_id = session_id.clone();
            }
            if item.metadata.message_id.is_empty() {
                item.metadata.message_id = message_id.clone();
            }
            slot.push(item);
        }
        let stored = slot.len();
        self.request_of_key.insert(key, request_id.clone());

        if stored > 0
            && self.historical_empty.as_ref().is_some_and(|marker| {
                marker.session_id == session_id && marker.message_id == message_id
            })
        {
            self.historical_empty = None;
        }

        if is_complete {
            self.pending = None;
            self.is_loading = false;
        }

        tracing::debug!(
            "[{}] Merged {} items of request {} into {}/{} ({} stored{})",
            LOG,
            received,
            request_id,
            session_id,
            message_id,
            stored,
            if is_complete { ", complete" } else { "" }
        );
        self.notify_state();
        true
    }

    fn accepts(&self, batch: &AnalysisResultBatch) -> bool {
        if !batch.request_id.is_empty() && self.invalidated_requests.contains(&batch.request_id) {
            return false;
        }
        if let Some(pending) = &self.pending {
            return pending.accepts(&batch.session_id, &batch.request_id);
        }
        match &self.current_session_id {
            Some(current) => *current == batch.session_id,
            None => true,
        }
    }

    /// Record a user-visible failure of the current request.
    pub fn set_error(&mut self, error: LoadingError) {
        self.pending = None;
        self.is_loading = false;
        self.error = Some(error);
        self.notify_state();
    }

    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.notify_state();
        }
    }

    // ========================================================================
    // Clearing
    // ========================================================================

    /// Drop every cached item of a session.
    pub fn clear_results(&mut self, session_id: &str) {
        let removed = self.results.remove(session_id);
        self.request_of_key.retain(|(session, _), _| session != session_id);
        if self
            .historical_empty
            .as_ref()
            .is_some_and(|marker| marker.session_id == session_id)
        {
            self.historical_empty = None;
        }
        tracing::debug!(
            "[{}] Cleared results of {} ({} messages)",
            LOG,
            session_id,
            removed.map_or(0, |messages| messages.len())
        );
        self.notify_state();
    }

    /// Full reset. Subscriptions are kept.
    pub fn clear_all(&mut self) {
        self.current_session_id = None;
        self.current_message_id = None;
        self.pending = None;
        self.is_loading = false;
        self.error = None;
        self.historical_empty = None;
        self.results.clear();
        self.request_of_key.clear();
        self.invalidated_requests.clear();
        tracing::info!("[{}] Cleared all results", LOG);
        self.notify_state();
    }

    /// Mark `(session, message)` as a historical request without results.
    /// Reset by the next request start or session switch.
    pub fn notify_historical_empty_result(&mut self, session_id: &str, message_id: &str) {
        self.historical_empty = Some(HistoricalEmptyMarker {
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
        });
        self.emit(ResultStoreEvent::HistoricalEmptyResult {
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
        });
        self.notify_state();
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Items of the current `(session, message)` only
    pub fn get_current_results(&self) -> Vec<ResultItem> {
        self.current_items().to_vec()
    }

    fn current_items(&self) -> &[ResultItem] {
        match (&self.current_session_id, &self.current_message_id) {
            (Some(session), Some(message)) => self.items_of(session, message),
            _ => &[],
        }
    }

    fn items_of(&self, session_id: &str, message_id: &str) -> &[ResultItem] {
        self.results
            .get(session_id)
            .and_then(|messages| messages.get(message_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_data(&self, session_id: &str, message_id: &str) -> bool {
        !self.items_of(session_id, message_id).is_empty()
    }

    pub fn has_current_data(&self) -> bool {
        !self.current_items().is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn get_pending_request_id(&self) -> Option<&str> {
        self.pending.as_ref().and_then(|p| p.request_id.as_deref())
    }

    pub fn get_current_session(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn get_current_message(&self) -> Option<&str> {
        self.current_message_id.as_deref()
    }

    pub fn get_error(&self) -> Option<&LoadingError> {
        self.error.as_ref()
    }

    /// Whether the historical-empty marker matches the current selection
    pub fn is_viewing_historical_empty_result(&self) -> bool {
        match (&self.historical_empty, &self.current_session_id, &self.current_message_id) {
            (Some(marker), Some(session), Some(message)) => {
                marker.session_id == *session && marker.message_id == *message
            }
            _ => false,
        }
    }

    pub fn buckets(&self) -> ResultBuckets {
        ResultBuckets::from_items(self.current_items())
    }

    pub fn display_flags(&self) -> DisplayFlags {
        DisplayFlags::compute(&self.buckets(), self.is_viewing_historical_empty_result())
    }

    pub fn get_state(&self) -> AnalysisResultState {
        AnalysisResultState {
            current_session_id: self.current_session_id.clone(),
            current_message_id: self.current_message_id.clone(),
            pending_request_id: self.get_pending_request_id().map(str::to_string),
            is_loading: self.is_loading,
            error: self.error.clone(),
            historical_empty: self.historical_empty.clone(),
            results_by_session_and_message: self.results.clone(),
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Observe the full state. The current state is delivered immediately.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&AnalysisResultState) + Send + 'static,
    {
        let id = self.ids.next_id();
        self.state_listeners.insert(id, Box::new(listener));
        let snapshot = self.get_state();
        self.state_listeners.notify_one(LOG, id, &snapshot);
        id
    }

    /// Listen for one kind of store event
    pub fn on<F>(&mut self, kind: ResultStoreEventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&ResultStoreEvent) + Send + 'static,
    {
        let id = self.ids.next_id();
        self.event_listeners
            .entry(kind)
            .or_default()
            .insert(id, Box::new(listener));
        self.subscription_kinds.insert(id, kind);
        id
    }

    /// Remove a subscription made with `subscribe` or `on`
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if self.state_listeners.remove(id) {
            return true;
        }
        let Some(kind) = self.subscription_kinds.remove(&id) else {
            return false;
        };
        self.event_listeners
            .get_mut(&kind)
            .is_some_and(|listeners| listeners.remove(id))
    }

    fn emit(&mut self, event: ResultStoreEvent) {
        if let Some(listeners) = self.event_listeners.get_mut(&event.kind()) {
            listeners.notify(LOG, &event);
        }
    }

    fn notify_state(&mut self) {
        if self.state_listeners.is_empty() {
            return;
        }
        let snapshot = self.get_state();
        self.state_listeners.notify(LOG, &snapshot);
    }
}
