//! Backend Event Types
//!
//! The closed set of push events the analysis backend emits, decoded from
//! `(event name, JSON payload)` pairs into one strongly typed union. Payloads
//! are tolerant of the backend's compatibility duplicates: every session
//! reference may arrive as `sessionId` or `threadId`, and error text as
//! `message` or `error` (often both at once).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::progress::{clamp_percent, ProgressInfo, ProgressStage};
use crate::results::AnalysisResultBatch;

/// Default error code when the backend omits one.
pub const DEFAULT_ERROR_CODE: &str = "ANALYSIS_ERROR";

/// Queue state reported while an analysis waits for a worker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Starting,
}

impl QueueStatus {
    /// Progress stage synthesized for this queue state.
    pub fn stage(&self) -> ProgressStage {
        match self {
            Self::Waiting => ProgressStage::Waiting,
            Self::Starting => ProgressStage::Initializing,
        }
    }
}

/// Event names, one per [`BackendEvent`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendEventKind {
    ChatLoading,
    AnalysisCompleted,
    AnalysisError,
    AnalysisCancelled,
    AnalysisProgress,
    AnalysisQueueStatus,
    ResultUpdate,
    ResultClear,
    ResultLoading,
}

impl BackendEventKind {
    pub const ALL: [BackendEventKind; 9] = [
        Self::ChatLoading,
        Self::AnalysisCompleted,
        Self::AnalysisError,
        Self::AnalysisCancelled,
        Self::AnalysisProgress,
        Self::AnalysisQueueStatus,
        Self::ResultUpdate,
        Self::ResultClear,
        Self::ResultLoading,
    ];

    /// Name the backend emits this event under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatLoading => "chat-loading",
            Self::AnalysisCompleted => "analysis-completed",
            Self::AnalysisError => "analysis-error",
            Self::AnalysisCancelled => "analysis-cancelled",
            Self::AnalysisProgress => "analysis-progress",
            Self::AnalysisQueueStatus => "analysis-queue-status",
            Self::ResultUpdate => "analysis-result-update",
            Self::ResultClear => "analysis-result-clear",
            Self::ResultLoading => "analysis-result-loading",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for BackendEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded backend push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendEvent {
    /// Chat/analysis loading flag for a session
    ChatLoading { session_id: String, loading: bool },

    /// Analysis finished successfully
    AnalysisCompleted {
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Analysis failed
    AnalysisError {
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        #[serde(default)]
        recovery_suggestions: Vec<String>,
    },

    /// Analysis was cancelled by the user
    AnalysisCancelled {
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Progress update
    AnalysisProgress {
        session_id: String,
        progress: ProgressInfo,
    },

    /// Waiting for / leaving the analysis queue
    AnalysisQueueStatus {
        session_id: String,
        status: QueueStatus,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<i64>,
    },

    /// A batch of result items
    ResultUpdate { batch: AnalysisResultBatch },

    /// All results of a session were discarded by the backend
    ResultClear { session_id: String },

    /// Result loading flag for a request
    ResultLoading {
        session_id: String,
        loading: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

// ============================================================================
// Wire payloads
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadingWire {
    session_id: Option<String>,
    thread_id: Option<String>,
    #[serde(default)]
    loading: bool,
    request_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScopeWire {
    session_id: Option<String>,
    thread_id: Option<String>,
    request_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorWire {
    session_id: Option<String>,
    thread_id: Option<String>,
    request_id: Option<String>,
    code: Option<String>,
    message: Option<String>,
    error: Option<String>,
    details: Option<String>,
    recovery_suggestions: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressWire {
    session_id: Option<String>,
    thread_id: Option<String>,
    stage: Option<String>,
    progress: Option<f64>,
    message: Option<String>,
    step: Option<u32>,
    total: Option<u32>,
    #[serde(alias = "tool_name")]
    tool_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueWire {
    session_id: Option<String>,
    thread_id: Option<String>,
    status: QueueStatus,
    message: Option<String>,
    position: Option<i64>,
}

/// First non-empty of `sessionId` / `threadId`.
fn pick_session(session_id: Option<String>, thread_id: Option<String>) -> CoreResult<String> {
    session_id
        .filter(|s| !s.is_empty())
        .or(thread_id.filter(|s| !s.is_empty()))
        .ok_or_else(|| CoreError::parse("payload carries neither sessionId nor threadId"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn decode<T: for<'de> Deserialize<'de>>(kind: BackendEventKind, payload: serde_json::Value) -> CoreResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| CoreError::parse(format!("invalid '{}' payload: {}", kind, e)))
}

impl BackendEvent {
    /// Decode an event from the name it was emitted under and its payload.
    pub fn from_named(name: &str, payload: serde_json::Value) -> CoreResult<Self> {
        let kind = BackendEventKind::from_name(name)
            .ok_or_else(|| CoreError::not_found(format!("event '{}'", name)))?;

        let event = match kind {
            BackendEventKind::ChatLoading => {
                let w: LoadingWire = decode(kind, payload)?;
                Self::ChatLoading {
                    session_id: pick_session(w.session_id, w.thread_id)?,
                    loading: w.loading,
                }
            }
            BackendEventKind::AnalysisCompleted => {
                let w: ScopeWire = decode(kind, payload)?;
                Self::AnalysisCompleted {
                    session_id: pick_session(w.session_id, w.thread_id)?,
                    request_id: non_empty(w.request_id),
                }
            }
            BackendEventKind::AnalysisError => {
                let w: ErrorWire = decode(kind, payload)?;
                Self::AnalysisError {
                    session_id: pick_session(w.session_id, w.thread_id)?,
                    request_id: non_empty(w.request_id),
                    code: non_empty(w.code).unwrap_or_else(|| DEFAULT_ERROR_CODE.to_string()),
                    message: non_empty(w.message).or(w.error).unwrap_or_default(),
                    details: non_empty(w.details),
                    recovery_suggestions: w.recovery_suggestions.unwrap_or_default(),
                }
            }
            BackendEventKind::AnalysisCancelled => {
                let w: ScopeWire = decode(kind, payload)?;
                Self::AnalysisCancelled {
                    session_id: pick_session(w.session_id, w.thread_id)?,
                    request_id: non_empty(w.request_id),
                }
            }
            BackendEventKind::AnalysisProgress => {
                let w: ProgressWire = decode(kind, payload)?;
                let mut progress = ProgressInfo::new(
                    w.stage.unwrap_or_default(),
                    0,
                    w.message.unwrap_or_default(),
                    w.step.unwrap_or(0),
                    w.total.unwrap_or(0),
                );
                progress.progress = clamp_percent(w.progress.unwrap_or(0.0).round() as i64);
                progress.tool_name = non_empty(w.tool_name);
                Self::AnalysisProgress {
                    session_id: pick_session(w.session_id, w.thread_id)?,
                    progress,
                }
            }
            BackendEventKind::AnalysisQueueStatus => {
                let w: QueueWire = decode(kind, payload)?;
                Self::AnalysisQueueStatus {
                    session_id: pick_session(w.session_id, w.thread_id)?,
                    status: w.status,
                    message: w.message.unwrap_or_default(),
                    position: w.position,
                }
            }
            BackendEventKind::ResultUpdate => {
                let batch: AnalysisResultBatch = decode(kind, payload)?;
                if batch.session_id.is_empty() {
                    return Err(CoreError::parse("result batch without sessionId"));
                }
                Self::ResultUpdate { batch }
            }
            BackendEventKind::ResultClear => {
                let w: ScopeWire = decode(kind, payload)?;
                Self::ResultClear {
                    session_id: pick_session(w.session_id, w.thread_id)?,
                }
            }
            BackendEventKind::ResultLoading => {
                let w: LoadingWire = decode(kind, payload)?;
                Self::ResultLoading {
                    session_id: pick_session(w.session_id, w.thread_id)?,
                    loading: w.loading,
                    request_id: non_empty(w.request_id),
                }
            }
        };
        Ok(event)
    }

    pub fn kind(&self) -> BackendEventKind {
        match self {
            Self::ChatLoading { .. } => BackendEventKind::ChatLoading,
            Self::AnalysisCompleted { .. } => BackendEventKind::AnalysisCompleted,
            Self::AnalysisError { .. } => BackendEventKind::AnalysisError,
            Self::AnalysisCancelled { .. } => BackendEventKind::AnalysisCancelled,
            Self::AnalysisProgress { .. } => BackendEventKind::AnalysisProgress,
            Self::AnalysisQueueStatus { .. } => BackendEventKind::AnalysisQueueStatus,
            Self::ResultUpdate { .. } => BackendEventKind::ResultUpdate,
            Self::ResultClear { .. } => BackendEventKind::ResultClear,
            Self::ResultLoading { .. } => BackendEventKind::ResultLoading,
        }
    }

    /// Session the event refers to.
    pub fn session_id(&self) -> &str {
        match self {
            Self::ChatLoading { session_id, .. }
            | Self::AnalysisCompleted { session_id, .. }
            | Self::AnalysisError { session_id, .. }
            | Self::AnalysisCancelled { session_id, .. }
            | Self::AnalysisProgress { session_id, .. }
            | Self::AnalysisQueueStatus { session_id, .. }
            | Self::ResultClear { session_id }
            | Self::ResultLoading { session_id, .. } => session_id,
            Self::ResultUpdate { batch } => &batch.session_id,
        }
    }
}

// ============================================================================
// Stream adaptation
// ============================================================================

/// Errors that can occur while adapting a recorded event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Input that isn't an event record at all
    InvalidFormat(String),
    /// Event record with a malformed payload
    ParseError(String),
    /// Event name not part of the backend vocabulary
    UnsupportedEvent(String),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AdapterError::UnsupportedEvent(msg) => write!(f, "Unsupported event: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// An event plus its offset (ms) from the start of a recording, if recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub at_ms: Option<i64>,
    pub event: BackendEvent,
}

/// Converts raw input lines into backend events.
pub trait EventAdapter: Send {
    /// Returns the adapter name for logging.
    fn name(&self) -> &'static str;

    /// Adapt one input line. A line may produce zero or more events.
    fn adapt(&mut self, input: &str) -> Result<Vec<RecordedEvent>, AdapterError>;

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
    at_ms: Option<i64>,
}

/// Adapter for JSON-lines recordings:
/// `{"event": "<name>", "payload": {...}, "atMs": 120}` per line.
/// Blank lines and `#` comments produce nothing.
#[derive(Debug, Default)]
pub struct JsonLinesAdapter {
    lines_seen: usize,
}

impl JsonLinesAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines handed to [`EventAdapter::adapt`] since the last reset.
    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }
}

impl EventAdapter for JsonLinesAdapter {
    fn name(&self) -> &'static str {
        "json-lines"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<RecordedEvent>, AdapterError> {
        self.lines_seen += 1;
        let line = input.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Vec::new());
        }

        let record: EventRecord = serde_json::from_str(line).map_err(|e| {
            AdapterError::InvalidFormat(format!("line {}: {}", self.lines_seen, e))
        })?;
        let payload = if record.payload.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            record.payload
        };

        let event = BackendEvent::from_named(&record.event, payload).map_err(|e| match e {
            CoreError::NotFound(_) => AdapterError::UnsupportedEvent(record.event.clone()),
            other => AdapterError::ParseError(format!("line {}: {}", self.lines_seen, other)),
        })?;

        Ok(vec![RecordedEvent {
            at_ms: record.at_ms,
            event,
        }])
    }

    fn reset(&mut self) {
        self.lines_seen = 0;
    }
}
