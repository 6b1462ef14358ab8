//! Application State
//!
//! Composition root holding the process-wide manager instances. Each manager
//! sits behind its own `tokio::sync::Mutex`; when both are needed the lock
//! order is registry, then results.

use std::sync::Arc;

use insight_desk_core::{BackendEvent, Clock, SystemClock};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::models::settings::AppConfig;
use crate::services::analysis_results::{AnalysisResultState, AnalysisResultStore, DisplayFlags};
use crate::services::event_aggregator::EventAggregator;
use crate::services::event_bridge::EventBridge;
use crate::services::loading::{SessionLoadingRegistry, SessionLoadingState};
use crate::utils::error::AppResult;

/// Point-in-time view of both managers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub sessions: Vec<SessionLoadingState>,
    pub results: AnalysisResultState,
    pub display: DisplayFlags,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    registry: Arc<Mutex<SessionLoadingRegistry>>,
    results: Arc<Mutex<AnalysisResultStore>>,
    aggregator: Arc<Mutex<EventAggregator>>,
    /// Events emitted by the aggregator, waiting to be dispatched
    outbox: Arc<Mutex<mpsc::UnboundedReceiver<BackendEvent>>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create state driven by the system clock
    pub fn new(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create state driven by an explicit clock
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = EventAggregator::new(config.aggregator_config(), clock.clone(), move |event| {
            if tx.send(event).is_err() {
                tracing::warn!("[AppState] Outbox closed, aggregator event dropped");
            }
        });

        Self {
            registry: Arc::new(Mutex::new(SessionLoadingRegistry::new(
                config.loading_config(),
                clock.clone(),
            ))),
            results: Arc::new(Mutex::new(AnalysisResultStore::new())),
            aggregator: Arc::new(Mutex::new(aggregator)),
            outbox: Arc::new(Mutex::new(rx)),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn registry(&self) -> Arc<Mutex<SessionLoadingRegistry>> {
        self.registry.clone()
    }

    pub fn results(&self) -> Arc<Mutex<AnalysisResultStore>> {
        self.results.clone()
    }

    pub fn aggregator(&self) -> Arc<Mutex<EventAggregator>> {
        self.aggregator.clone()
    }

    /// Route one decoded backend event to the managers
    pub async fn dispatch(&self, event: BackendEvent) {
        let mut registry = self.registry.lock().await;
        let mut results = self.results.lock().await;
        EventBridge::new(&mut registry, &mut results).dispatch(event);
    }

    /// Decode and route an event received under `name`
    pub async fn dispatch_named(&self, name: &str, payload: serde_json::Value) -> AppResult<()> {
        let event = BackendEvent::from_named(name, payload)?;
        self.dispatch(event).await;
        Ok(())
    }

    /// Dispatch everything the aggregator has emitted. Returns the count.
    pub async fn drain_outbox(&self) -> usize {
        let events: Vec<BackendEvent> = {
            let mut outbox = self.outbox.lock().await;
            std::iter::from_fn(|| outbox.try_recv().ok()).collect()
        };
        let count = events.len();
        for event in events {
            self.dispatch(event).await;
        }
        count
    }

    /// Run every due timer: aggregator flushes first (their batches are
    /// dispatched), then registry timeouts and deferred clears.
    pub async fn fire_due_timers(&self) -> usize {
        let flushed = self.aggregator.lock().await.fire_due_timers();
        self.drain_outbox().await;
        let cleared = self.registry.lock().await.fire_due_timers();
        flushed + cleared
    }

    /// Earliest deadline across all managers
    pub async fn next_deadline(&self) -> Option<i64> {
        let registry = self.registry.lock().await.next_deadline();
        let aggregator = self.aggregator.lock().await.next_deadline();
        match (registry, aggregator) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        let registry = self.registry.lock().await;
        let results = self.results.lock().await;
        StateSnapshot {
            sessions: registry.sessions(),
            results: results.get_state(),
            display: results.display_flags(),
        }
    }

    /// Spawn the background task that fires timers on a fixed interval.
    pub fn spawn_timer_pump(&self) -> JoinHandle<()> {
        let state = self.clone();
        let period = self.config.timer_poll_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let fired = state.fire_due_timers().await;
                if fired > 0 {
                    tracing::trace!("[AppState] Timer pump fired {} timers", fired);
                }
            }
        })
    }
}
