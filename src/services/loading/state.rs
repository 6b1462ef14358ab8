//! Loading State Types

use std::time::Duration;

use insight_desk_core::{LoadingError, ProgressInfo};
use serde::{Deserialize, Serialize};

/// Loading, progress and error state of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLoadingState {
    pub session_id: String,
    pub is_loading: bool,
    /// Set on the transition into loading (ms since epoch)
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LoadingError>,
}

impl SessionLoadingState {
    pub(crate) fn new(session_id: impl Into<String>, start_time: i64) -> Self {
        Self {
            session_id: session_id.into(),
            is_loading: false,
            start_time,
            progress: None,
            error: None,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Milliseconds spent loading at `now_ms`
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.start_time).max(0)
    }
}

/// Timing of the registry's deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingRegistryConfig {
    /// Inactivity after which a loading session is cleared
    pub timeout: Duration,
    /// Delay between `set_loading(false)` and the clear
    pub stop_delay: Duration,
    /// How long a completed progress stays visible
    pub completion_clear_delay: Duration,
}

impl Default for LoadingRegistryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10 * 60),
            stop_delay: Duration::from_millis(100),
            completion_clear_delay: Duration::from_millis(300),
        }
    }
}

/// Per-session timer slots. Each session holds at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadingTimer {
    Timeout,
    /// Clear after a completed progress; later progress cancels it
    DeferredClear,
    /// Clear after `set_loading(false)`; only a restart or a clear cancels it
    StopClear,
}
