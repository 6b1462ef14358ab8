//! Event Aggregator
//!
//! Producer side of result batches. Items are buffered per session and
//! flushed as one `analysis-result-update` after a quiet period, or right
//! away when the analysis completes. Also emits the loading, error and
//! cancellation events of a request.

pub mod error_info;

pub use error_info::{ErrorCode, ErrorInfo};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use insight_desk_core::{
    duration_ms, AnalysisResultBatch, BackendEvent, Clock, FileData, InsightData, MetricData,
    ResultData, ResultItem, ResultMetadata, ResultSource, TimerArena,
};
use serde::{Deserialize, Serialize};

const LOG: &str = "EventAggregator";

/// Timing of the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Quiet period after the last added item before a flush
    pub flush_delay: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_millis(50),
        }
    }
}

/// Metrics and insights produced together by a dashboard step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub metrics: Vec<MetricData>,
    #[serde(default)]
    pub insights: Vec<InsightData>,
}

/// Receives every event the aggregator emits.
pub type EventSink = Box<dyn FnMut(BackendEvent) + Send>;

#[derive(Debug)]
struct PendingBatch {
    message_id: String,
    request_id: String,
    items: Vec<ResultItem>,
}

pub struct EventAggregator {
    config: AggregatorConfig,
    clock: Arc<dyn Clock>,
    pending: HashMap<String, PendingBatch>,
    timers: TimerArena<String>,
    sink: EventSink,
}

impl std::fmt::Debug for EventAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventAggregator")
            .field("config", &self.config)
            .field("pending_sessions", &self.pending.len())
            .field("timers", &self.timers.len())
            .finish()
    }
}

impl EventAggregator {
    pub fn new<F>(config: AggregatorConfig, clock: Arc<dyn Clock>, sink: F) -> Self
    where
        F: FnMut(BackendEvent) + Send + 'static,
    {
        Self {
            config,
            clock,
            pending: HashMap::new(),
            timers: TimerArena::new(),
            sink: Box::new(sink),
        }
    }

    /// Non-blocking checks on an item about to be added.
    pub fn validate_item(&self, session_id: &str, data: &ResultData) -> Vec<String> {
        let mut warnings = Vec::new();
        if session_id.is_empty() {
            warnings.push("sessionId is empty".to_string());
        }
        if data.is_blank() {
            warnings.push(format!("{} data is empty", data.item_type()));
        }
        warnings
    }

    /// Buffer an item and re-arm the session's flush timer. Returns the
    /// item id.
    pub fn add_item(
        &mut self,
        session_id: &str,
        message_id: &str,
        request_id: &str,
        data: ResultData,
        file_name: Option<&str>,
    ) -> String {
        for warning in self.validate_item(session_id, &data) {
            tracing::warn!("[{}] Validation warning: {}", LOG, warning);
        }

        let now = self.clock.now_ms();
        let item = ResultItem {
            id: uuid::Uuid::new_v4().to_string(),
            data,
            metadata: ResultMetadata {
                session_id: session_id.to_string(),
                message_id: message_id.to_string(),
                timestamp: now,
                file_name: file_name.map(str::to_string),
            },
            source: ResultSource::Realtime,
        };
        let id = item.id.clone();
        tracing::debug!(
            "[{}] AddItem: type={}, session={}, message={}, request={}",
            LOG,
            item.item_type(),
            session_id,
            message_id,
            request_id
        );

        let batch = self
            .pending
            .entry(session_id.to_string())
            .or_insert_with(|| PendingBatch {
                message_id: message_id.to_string(),
                request_id: request_id.to_string(),
                items: Vec::new(),
            });
        if !message_id.is_empty() {
            batch.message_id = message_id.to_string();
        }
        if !request_id.is_empty() {
            batch.request_id = request_id.to_string();
        }
        batch.items.push(item);

        self.timers.schedule(
            session_id.to_string(),
            now + duration_ms(self.config.flush_delay),
        );
        id
    }

    pub fn add_echarts(&mut self, session_id: &str, message_id: &str, request_id: &str, chart: serde_json::Value) -> String {
        self.add_item(session_id, message_id, request_id, ResultData::Echarts(chart), None)
    }

    pub fn add_image(
        &mut self,
        session_id: &str,
        message_id: &str,
        request_id: &str,
        image: impl Into<String>,
        file_name: Option<&str>,
    ) -> String {
        self.add_item(session_id, message_id, request_id, ResultData::Image(image.into()), file_name)
    }

    pub fn add_table(&mut self, session_id: &str, message_id: &str, request_id: &str, table: serde_json::Value) -> String {
        self.add_item(session_id, message_id, request_id, ResultData::Table(table), None)
    }

    pub fn add_csv(
        &mut self,
        session_id: &str,
        message_id: &str,
        request_id: &str,
        csv: impl Into<String>,
        file_name: Option<&str>,
    ) -> String {
        self.add_item(session_id, message_id, request_id, ResultData::Csv(csv.into()), file_name)
    }

    pub fn add_metric(&mut self, session_id: &str, message_id: &str, request_id: &str, metric: MetricData) -> String {
        self.add_item(session_id, message_id, request_id, ResultData::Metric(metric), None)
    }

    pub fn add_insight(&mut self, session_id: &str, message_id: &str, request_id: &str, insight: InsightData) -> String {
        self.add_item(session_id, message_id, request_id, ResultData::Insight(insight), None)
    }

    pub fn add_file(&mut self, session_id: &str, message_id: &str, request_id: &str, file: FileData) -> String {
        let file_name = file.file_name.clone();
        self.add_item(session_id, message_id, request_id, ResultData::File(file), Some(&file_name))
    }

    /// Add every metric, then every insight.
    pub fn add_dashboard_data(&mut self, session_id: &str, message_id: &str, request_id: &str, data: DashboardData) -> Vec<String> {
        let mut ids = Vec::with_capacity(data.metrics.len() + data.insights.len());
        for metric in data.metrics {
            ids.push(self.add_metric(session_id, message_id, request_id, metric));
        }
        for insight in data.insights {
            ids.push(self.add_insight(session_id, message_id, request_id, insight));
        }
        ids
    }

    /// Flush a session now. Returns the flushed items (empty when nothing
    /// was buffered).
    pub fn flush_now(&mut self, session_id: &str, is_complete: bool) -> Vec<ResultItem> {
        self.timers.cancel(&session_id.to_string());
        self.flush(session_id, is_complete)
    }

    /// Flush every session whose quiet period has passed.
    pub fn fire_due_timers(&mut self) -> usize {
        let now = self.clock.now_ms();
        let due = self.timers.take_due(now);
        let fired = due.len();
        for (session_id, _) in due {
            tracing::debug!("[{}] Timer flush for {}", LOG, session_id);
            self.flush(&session_id, false);
        }
        fired
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.timers.next_deadline()
    }

    fn flush(&mut self, session_id: &str, is_complete: bool) -> Vec<ResultItem> {
        let Some(batch) = self.pending.remove(session_id).filter(|b| !b.items.is_empty()) else {
            tracing::debug!("[{}] Flush skipped, nothing pending for {}", LOG, session_id);
            return Vec::new();
        };

        let items = batch.items;
        tracing::debug!(
            "[{}] Flushing {} items for session={}, message={}, request={}, complete={}",
            LOG,
            items.len(),
            session_id,
            batch.message_id,
            batch.request_id,
            is_complete
        );
        let timestamp = self.clock.now_ms();
        self.emit(BackendEvent::ResultUpdate {
            batch: AnalysisResultBatch {
                session_id: session_id.to_string(),
                message_id: batch.message_id,
                request_id: batch.request_id,
                items: items.clone(),
                is_complete,
                timestamp,
            },
        });
        items
    }

    /// Drop buffered items of a session and tell listeners to clear it.
    pub fn clear(&mut self, session_id: &str) {
        self.timers.cancel(&session_id.to_string());
        self.pending.remove(session_id);
        self.emit(BackendEvent::ResultClear {
            session_id: session_id.to_string(),
        });
    }

    pub fn pending_count(&self, session_id: &str) -> usize {
        self.pending.get(session_id).map_or(0, |b| b.items.len())
    }

    // ========================================================================
    // Request lifecycle events
    // ========================================================================

    pub fn set_loading(&mut self, session_id: &str, loading: bool, request_id: &str) {
        self.emit(BackendEvent::ResultLoading {
            session_id: session_id.to_string(),
            loading,
            request_id: non_empty(request_id),
        });
    }

    pub fn emit_error(&mut self, session_id: &str, request_id: &str, message: &str) {
        self.emit_error_with_details(session_id, request_id, ErrorCode::AnalysisError.as_str(), message, "");
    }

    pub fn emit_error_with_code(&mut self, session_id: &str, request_id: &str, code: &str, message: &str) {
        self.emit_error_with_details(session_id, request_id, code, message, "");
    }

    pub fn emit_error_with_details(
        &mut self,
        session_id: &str,
        request_id: &str,
        code: &str,
        message: &str,
        details: &str,
    ) {
        let info = ErrorInfo::new(code, message, details, self.clock.now_ms());
        tracing::warn!(
            "[{}] Emitting error: code={}, message={}, suggestions={}",
            LOG,
            info.code,
            info.message,
            info.recovery_suggestions.len()
        );
        self.emit(BackendEvent::AnalysisError {
            session_id: session_id.to_string(),
            request_id: non_empty(request_id),
            code: info.code,
            message: info.message,
            details: non_empty(&info.details),
            recovery_suggestions: info.recovery_suggestions,
        });
    }

    pub fn emit_timeout(&mut self, session_id: &str, request_id: &str, elapsed: Duration) {
        let text = format!("Analysis timed out after {}s", elapsed.as_secs());
        self.emit_error_with_details(session_id, request_id, ErrorCode::AnalysisTimeout.as_str(), &text, &text);
    }

    pub fn emit_cancelled(&mut self, session_id: &str, request_id: &str) {
        let info = ErrorInfo::new(ErrorCode::AnalysisCancelled.as_str(), "", "", self.clock.now_ms());
        tracing::info!("[{}] Analysis {} cancelled: {}", LOG, session_id, info.message);
        self.emit(BackendEvent::AnalysisCancelled {
            session_id: session_id.to_string(),
            request_id: non_empty(request_id),
        });
    }

    fn emit(&mut self, event: BackendEvent) {
        tracing::debug!("[{}] Emitting '{}' for {}", LOG, event.kind().name(), event.session_id());
        (self.sink)(event);
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
