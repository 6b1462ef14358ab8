//! Settings Models
//!
//! Application configuration and settings data structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::services::event_aggregator::AggregatorConfig;
use crate::services::loading::LoadingRegistryConfig;

/// Log levels accepted by `log_level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Loading sessions with no activity for this long are cleared (ms)
    pub loading_timeout_ms: u64,
    /// Delay before a finished session's spinner is removed (ms)
    pub loading_stop_delay_ms: u64,
    /// How long a "complete" progress bar stays visible (ms)
    pub completion_clear_delay_ms: u64,
    /// Quiet period before buffered result items are flushed (ms)
    pub aggregator_flush_delay_ms: u64,
    /// Interval of the background timer pump (ms)
    pub timer_poll_interval_ms: u64,
    /// Log level: "trace", "debug", "info", "warn" or "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Enable debug mode
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            loading_timeout_ms: 10 * 60 * 1000,
            loading_stop_delay_ms: 100,
            completion_clear_delay_ms: 300,
            aggregator_flush_delay_ms: 50,
            timer_poll_interval_ms: 50,
            log_level: default_log_level(),
            debug_mode: false,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub loading_timeout_ms: Option<u64>,
    pub loading_stop_delay_ms: Option<u64>,
    pub completion_clear_delay_ms: Option<u64>,
    pub aggregator_flush_delay_ms: Option<u64>,
    pub timer_poll_interval_ms: Option<u64>,
    pub log_level: Option<String>,
    pub debug_mode: Option<bool>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(timeout) = update.loading_timeout_ms {
            self.loading_timeout_ms = timeout;
        }
        if let Some(delay) = update.loading_stop_delay_ms {
            self.loading_stop_delay_ms = delay;
        }
        if let Some(delay) = update.completion_clear_delay_ms {
            self.completion_clear_delay_ms = delay;
        }
        if let Some(delay) = update.aggregator_flush_delay_ms {
            self.aggregator_flush_delay_ms = delay;
        }
        if let Some(interval) = update.timer_poll_interval_ms {
            self.timer_poll_interval_ms = interval;
        }
        if let Some(level) = update.log_level {
            self.log_level = level;
        }
        if let Some(debug) = update.debug_mode {
            self.debug_mode = debug;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.loading_timeout_ms < 1_000 {
            return Err("loadingTimeoutMs must be at least 1000".to_string());
        }

        // Delays only smooth transitions; anything near the timeout is a mistake
        for (name, value) in [
            ("loadingStopDelayMs", self.loading_stop_delay_ms),
            ("completionClearDelayMs", self.completion_clear_delay_ms),
            ("aggregatorFlushDelayMs", self.aggregator_flush_delay_ms),
        ] {
            if value > 10_000 {
                return Err(format!("{} cannot exceed 10000", name));
            }
        }

        if self.timer_poll_interval_ms == 0 || self.timer_poll_interval_ms > 1_000 {
            return Err("timerPollIntervalMs must be between 1 and 1000".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }

    /// Timing settings for the session loading registry
    pub fn loading_config(&self) -> LoadingRegistryConfig {
        LoadingRegistryConfig {
            timeout: Duration::from_millis(self.loading_timeout_ms),
            stop_delay: Duration::from_millis(self.loading_stop_delay_ms),
            completion_clear_delay: Duration::from_millis(self.completion_clear_delay_ms),
        }
    }

    /// Timing settings for the result event aggregator
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            flush_delay: Duration::from_millis(self.aggregator_flush_delay_ms),
        }
    }

    /// Interval of the background timer pump
    pub fn timer_poll_interval(&self) -> Duration {
        Duration::from_millis(self.timer_poll_interval_ms)
    }
}
