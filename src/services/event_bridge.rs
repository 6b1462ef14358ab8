//! Event Bridge
//!
//! Routes decoded backend events to the loading registry and the result
//! store. Dispatch never fails; events for unknown sessions are handled or
//! ignored per event type.

use insight_desk_core::{BackendEvent, LoadingError, ProgressInfo};

use crate::services::analysis_results::AnalysisResultStore;
use crate::services::loading::SessionLoadingRegistry;

const LOG: &str = "EventBridge";

/// Borrowing view over both managers for one dispatch.
pub struct EventBridge<'a> {
    registry: &'a mut SessionLoadingRegistry,
    results: &'a mut AnalysisResultStore,
}

impl<'a> EventBridge<'a> {
    pub fn new(registry: &'a mut SessionLoadingRegistry, results: &'a mut AnalysisResultStore) -> Self {
        Self { registry, results }
    }

    pub fn dispatch(&mut self, event: BackendEvent) {
        tracing::debug!(
            "[{}] {} for session {}",
            LOG,
            event.kind().name(),
            event.session_id()
        );

        match event {
            BackendEvent::ChatLoading { session_id, loading } => {
                self.registry.set_loading(&session_id, loading);
            }

            BackendEvent::AnalysisCompleted {
                session_id,
                request_id,
            } => {
                self.registry.complete(&session_id);
                if request_id.is_some() || self.is_current(&session_id) {
                    self.results.finish_request(request_id.as_deref());
                }
            }

            BackendEvent::AnalysisError {
                session_id,
                code,
                message,
                ..
            } => {
                let error = LoadingError::new(code, message);
                if self.is_current(&session_id) {
                    self.results.set_error(error.clone());
                }
                self.registry.set_error(&session_id, error);
            }

            BackendEvent::AnalysisCancelled { session_id, .. } => {
                self.registry.cancel(&session_id);
                if self.is_current(&session_id) {
                    self.results.set_loading(false, None, None);
                }
            }

            BackendEvent::AnalysisProgress {
                session_id,
                progress,
            } => {
                self.registry.update_progress(&session_id, progress);
            }

            BackendEvent::AnalysisQueueStatus {
                session_id,
                status,
                message,
                position,
            } => {
                if let Some(position) = position {
                    tracing::debug!("[{}] {} queued at position {}", LOG, session_id, position);
                }
                let progress = ProgressInfo::new(status.stage(), 0, message, 0, 0);
                self.registry.update_progress(&session_id, progress);
            }

            BackendEvent::ResultUpdate { batch } => {
                self.results.update_results(batch);
            }

            BackendEvent::ResultClear { session_id } => {
                self.results.clear_results(&session_id);
            }

            BackendEvent::ResultLoading {
                session_id,
                loading,
                request_id,
            } => {
                if loading {
                    if self.is_current(&session_id) {
                        self.results.set_loading(true, request_id.as_deref(), None);
                    } else {
                        tracing::debug!(
                            "[{}] Loading for background session {} ignored by result store",
                            LOG,
                            session_id
                        );
                    }
                } else {
                    self.results.finish_request(request_id.as_deref());
                }
            }
        }
    }

    fn is_current(&self, session_id: &str) -> bool {
        self.results.get_current_session() == Some(session_id)
    }
}
