//! Result Store Events
//!
//! Closed set of events published by the result store, each with its own
//! payload. Listeners register per [`ResultStoreEventKind`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResultStoreEvent {
    /// A request became pending for the current session/message
    #[serde(rename_all = "camelCase")]
    AnalysisStarted {
        session_id: Option<String>,
        message_id: Option<String>,
        request_id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    SessionSwitched {
        from_session_id: Option<String>,
        to_session_id: String,
    },

    #[serde(rename_all = "camelCase")]
    MessageSelected {
        session_id: Option<String>,
        from_message_id: Option<String>,
        to_message_id: String,
    },

    /// The user opened a historical request that produced nothing
    #[serde(rename_all = "camelCase")]
    HistoricalEmptyResult {
        session_id: String,
        message_id: String,
    },
}

/// Dispatch key of [`ResultStoreEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultStoreEventKind {
    AnalysisStarted,
    SessionSwitched,
    MessageSelected,
    HistoricalEmptyResult,
}

impl ResultStoreEventKind {
    pub const ALL: [ResultStoreEventKind; 4] = [
        Self::AnalysisStarted,
        Self::SessionSwitched,
        Self::MessageSelected,
        Self::HistoricalEmptyResult,
    ];

    /// Name used in logs and on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::AnalysisStarted => "analysis-started",
            Self::SessionSwitched => "session-switched",
            Self::MessageSelected => "message-selected",
            Self::HistoricalEmptyResult => "historical-empty-result",
        }
    }
}

impl std::fmt::Display for ResultStoreEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ResultStoreEvent {
    pub fn kind(&self) -> ResultStoreEventKind {
        match self {
            Self::AnalysisStarted { .. } => ResultStoreEventKind::AnalysisStarted,
            Self::SessionSwitched { .. } => ResultStoreEventKind::SessionSwitched,
            Self::MessageSelected { .. } => ResultStoreEventKind::MessageSelected,
            Self::HistoricalEmptyResult { .. } => ResultStoreEventKind::HistoricalEmptyResult,
        }
    }
}
