//! Result Store Snapshot

use std::collections::BTreeMap;

use insight_desk_core::{LoadingError, ResultItem};
use serde::{Deserialize, Serialize};

/// `(session, message)` scope of a historical-empty signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalEmptyMarker {
    pub session_id: String,
    pub message_id: String,
}

/// Copy of the store's state handed to subscribers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResultState {
    pub current_session_id: Option<String>,
    pub current_message_id: Option<String>,
    pub pending_request_id: Option<String>,
    pub is_loading: bool,
    pub error: Option<LoadingError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_empty: Option<HistoricalEmptyMarker>,
    /// session id -> message id -> items
    pub results_by_session_and_message: BTreeMap<String, BTreeMap<String, Vec<ResultItem>>>,
}

impl AnalysisResultState {
    /// Items of the current `(session, message)`, empty when either is unset
    pub fn current_results(&self) -> &[ResultItem] {
        let (Some(session), Some(message)) = (&self.current_session_id, &self.current_message_id)
        else {
            return &[];
        };
        self.results_by_session_and_message
            .get(session)
            .and_then(|messages| messages.get(message))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The request whose batches are currently awaited, with the scope it was
/// started in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingRequest {
    pub session_id: Option<String>,
    pub message_id: Option<String>,
    pub request_id: Option<String>,
}

impl PendingRequest {
    pub fn accepts(&self, session_id: &str, request_id: &str) -> bool {
        let id_ok = self
            .request_id
            .as_deref()
            .map_or(true, |pending| pending == request_id);
        let session_ok = self
            .session_id
            .as_deref()
            .map_or(true, |pending| pending == session_id);
        id_ok && session_ok
    }
}
