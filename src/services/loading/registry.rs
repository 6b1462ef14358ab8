//! Session Loading Registry
//!
//! Per-session state machine:
//! `Idle -> Loading -> (progress ...) -> Complete (deferred) -> Idle`, or
//! `Loading -> Error -> Idle` on `clear_error`. `Idle` means no entry.
//!
//! Deferred work (timeouts, delayed clears) lives in a [`TimerArena`] keyed
//! by `(session, timer)` and runs when the owner calls
//! [`SessionLoadingRegistry::fire_due_timers`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use insight_desk_core::{duration_ms, Clock, LoadingError, ProgressInfo, SystemClock, TimerArena};

use super::state::{LoadingRegistryConfig, LoadingTimer, SessionLoadingState};
use crate::services::listeners::{ListenerSet, SubscriptionId, SubscriptionIds};

const LOG: &str = "LoadingRegistry";

type TimerKey = (String, LoadingTimer);

/// Registry of loading state for every active or recently active session.
pub struct SessionLoadingRegistry {
    config: LoadingRegistryConfig,
    clock: Arc<dyn Clock>,
    sessions: HashMap<String, SessionLoadingState>,
    timers: TimerArena<TimerKey>,
    ids: SubscriptionIds,
    global_listeners: ListenerSet<BTreeSet<String>>,
    session_listeners: HashMap<String, ListenerSet<Option<SessionLoadingState>>>,
    /// Which session a per-session subscription belongs to
    subscription_sessions: HashMap<SubscriptionId, String>,
    /// Loading ids last delivered to global listeners
    last_loading_ids: BTreeSet<String>,
}

impl std::fmt::Debug for SessionLoadingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLoadingRegistry")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .field("timers", &self.timers.len())
            .field("global_listeners", &self.global_listeners.len())
            .field("session_listeners", &self.subscription_sessions.len())
            .finish()
    }
}

impl Default for SessionLoadingRegistry {
    fn default() -> Self {
        Self::new(LoadingRegistryConfig::default(), Arc::new(SystemClock))
    }
}

impl SessionLoadingRegistry {
    pub fn new(config: LoadingRegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            sessions: HashMap::new(),
            timers: TimerArena::new(),
            ids: SubscriptionIds::default(),
            global_listeners: ListenerSet::new(),
            session_listeners: HashMap::new(),
            subscription_sessions: HashMap::new(),
            last_loading_ids: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &LoadingRegistryConfig {
        &self.config
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Transition a session's loading flag.
    ///
    /// `true` creates or updates the entry, keeps `start_time` if it was
    /// already loading, clears any error and re-arms the timeout.
    /// `false` schedules a short deferred clear when the session is loading,
    /// otherwise clears right away (errored sessions are kept).
    pub fn set_loading(&mut self, session_id: &str, loading: bool) {
        let now = self.clock.now_ms();

        if loading {
            let state = self
                .sessions
                .entry(session_id.to_string())
                .or_insert_with(|| SessionLoadingState::new(session_id, now));
            if !state.is_loading {
                state.start_time = now;
            }
            state.is_loading = true;
            state.error = None;

            self.cancel_timer(session_id, LoadingTimer::DeferredClear);
            self.cancel_timer(session_id, LoadingTimer::StopClear);
            self.arm_timeout(session_id, now);
            tracing::debug!("[{}] Session {} started loading", LOG, session_id);
            self.notify(session_id);
            return;
        }

        self.cancel_timer(session_id, LoadingTimer::Timeout);
        let status = self
            .sessions
            .get(session_id)
            .map(|state| (state.is_loading, state.has_error()));
        match status {
            None => {
                tracing::debug!("[{}] Stop for unknown session {} ignored", LOG, session_id);
            }
            Some((true, _)) => {
                let deadline = now + duration_ms(self.config.stop_delay);
                self.timers.schedule(
                    (session_id.to_string(), LoadingTimer::StopClear),
                    deadline,
                );
                tracing::debug!("[{}] Session {} stopping, clear at {}", LOG, session_id, deadline);
            }
            Some((false, true)) => {}
            Some((false, false)) => self.remove_session(session_id),
        }
    }

    /// Upsert progress. Unknown sessions are created in loading state.
    /// Activity re-arms the timeout; a terminal progress schedules the
    /// completion clear, any other progress cancels a pending completion
    /// clear. A stopping session only takes the new progress data.
    pub fn update_progress(&mut self, session_id: &str, progress: ProgressInfo) {
        let now = self.clock.now_ms();
        let terminal = progress.is_terminal();

        let state = self.sessions.entry(session_id.to_string()).or_insert_with(|| {
            let mut state = SessionLoadingState::new(session_id, now);
            state.is_loading = true;
            state
        });
        let errored = state.has_error();
        state.progress = Some(progress);
        let stopping = self.has_pending_timer(session_id, LoadingTimer::StopClear);

        if stopping {
            tracing::debug!("[{}] Progress for stopping session {} keeps its clear", LOG, session_id);
        } else if !errored {
            self.arm_timeout(session_id, now);
            if terminal {
                let deadline = now + duration_ms(self.config.completion_clear_delay);
                self.timers.schedule(
                    (session_id.to_string(), LoadingTimer::DeferredClear),
                    deadline,
                );
                tracing::debug!("[{}] Session {} complete, clear at {}", LOG, session_id, deadline);
            } else {
                self.cancel_timer(session_id, LoadingTimer::DeferredClear);
            }
        }

        self.notify(session_id);
    }

    /// Force a known session to `complete`/100. Unknown sessions are ignored.
    pub fn complete(&mut self, session_id: &str) -> bool {
        if !self.sessions.contains_key(session_id) {
            tracing::debug!("[{}] Completion for unknown session {} ignored", LOG, session_id);
            return false;
        }
        tracing::info!("[{}] Session {} completed", LOG, session_id);
        self.update_progress(session_id, ProgressInfo::complete());
        true
    }

    /// Record a failure. The session stops loading and is kept until the
    /// error is cleared.
    pub fn set_error(&mut self, session_id: &str, error: LoadingError) {
        let now = self.clock.now_ms();
        tracing::warn!(
            "[{}] Session {} failed: {} ({})",
            LOG,
            session_id,
            error.message,
            error.code
        );

        let state = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionLoadingState::new(session_id, now));
        state.is_loading = false;
        state.error = Some(error);

        self.cancel_all_timers(session_id);
        self.notify(session_id);
    }

    /// Remove the error; the entry goes away too unless it is loading.
    pub fn clear_error(&mut self, session_id: &str) {
        let Some(state) = self.sessions.get_mut(session_id) else {
            return;
        };
        if state.error.take().is_none() {
            return;
        }
        if state.is_loading {
            self.notify(session_id);
        } else {
            self.remove_session(session_id);
        }
    }

    /// Drop all state, timers and subscriptions of a session.
    pub fn clear_session(&mut self, session_id: &str) {
        self.remove_session(session_id);
        if let Some(listeners) = self.session_listeners.remove(session_id) {
            self.subscription_sessions
                .retain(|_, s| s.as_str() != session_id);
            tracing::debug!(
                "[{}] Dropped {} subscriptions of {}",
                LOG,
                listeners.len(),
                session_id
            );
        }
    }

    /// Immediate removal without the deferred delay. Subscriptions are kept.
    pub fn cancel(&mut self, session_id: &str) {
        if self.sessions.contains_key(session_id) {
            tracing::info!("[{}] Session {} cancelled", LOG, session_id);
        }
        self.remove_session(session_id);
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Run every timer whose deadline has passed. Returns how many fired.
    pub fn fire_due_timers(&mut self) -> usize {
        let now = self.clock.now_ms();
        let due = self.timers.take_due(now);
        let fired = due.len();

        for ((session_id, timer), _) in due {
            let Some(state) = self.sessions.get(&session_id) else {
                continue;
            };
            match timer {
                LoadingTimer::Timeout => {
                    tracing::warn!(
                        "[{}] Session {} timed out after {}ms without activity",
                        LOG,
                        session_id,
                        state.elapsed_ms(now)
                    );
                    self.remove_session(&session_id);
                }
                LoadingTimer::DeferredClear | LoadingTimer::StopClear => {
                    if state.has_error() {
                        continue;
                    }
                    tracing::debug!("[{}] Deferred clear of {}", LOG, session_id);
                    self.remove_session(&session_id);
                }
            }
        }

        fired
    }

    /// Earliest pending deadline (ms since epoch)
    pub fn next_deadline(&self) -> Option<i64> {
        self.timers.next_deadline()
    }

    pub fn has_pending_timer(&self, session_id: &str, timer: LoadingTimer) -> bool {
        self.timers.is_scheduled(&(session_id.to_string(), timer))
    }

    fn arm_timeout(&mut self, session_id: &str, now: i64) {
        self.timers.schedule(
            (session_id.to_string(), LoadingTimer::Timeout),
            now + duration_ms(self.config.timeout),
        );
    }

    fn cancel_timer(&mut self, session_id: &str, timer: LoadingTimer) {
        self.timers.cancel(&(session_id.to_string(), timer));
    }

    fn cancel_all_timers(&mut self, session_id: &str) {
        self.timers.cancel_where(|(s, _)| s == session_id);
    }

    fn remove_session(&mut self, session_id: &str) {
        self.cancel_all_timers(session_id);
        if self.sessions.remove(session_id).is_some() {
            self.notify(session_id);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn is_loading(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|state| state.is_loading)
    }

    pub fn get_progress(&self, session_id: &str) -> Option<ProgressInfo> {
        self.sessions
            .get(session_id)
            .and_then(|state| state.progress.clone())
    }

    pub fn get_error(&self, session_id: &str) -> Option<LoadingError> {
        self.sessions
            .get(session_id)
            .and_then(|state| state.error.clone())
    }

    pub fn get_session_state(&self, session_id: &str) -> Option<SessionLoadingState> {
        self.sessions.get(session_id).cloned()
    }

    /// All sessions currently flagged loading
    pub fn get_loading_session_ids(&self) -> BTreeSet<String> {
        self.sessions
            .values()
            .filter(|state| state.is_loading)
            .map(|state| state.session_id.clone())
            .collect()
    }

    /// Every tracked session, ordered by id
    pub fn sessions(&self) -> Vec<SessionLoadingState> {
        let mut all: Vec<SessionLoadingState> = self.sessions.values().cloned().collect();
        all.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        all
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Observe the set of loading session ids. The current set is delivered
    /// immediately.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&BTreeSet<String>) + Send + 'static,
    {
        let id = self.ids.next_id();
        self.global_listeners.insert(id, Box::new(listener));
        let snapshot = self.get_loading_session_ids();
        self.global_listeners.notify_one(LOG, id, &snapshot);
        id
    }

    /// Observe one session's state (`None` while it has no entry). The
    /// current state is delivered immediately.
    pub fn subscribe_to_session<F>(&mut self, session_id: &str, listener: F) -> SubscriptionId
    where
        F: FnMut(&Option<SessionLoadingState>) + Send + 'static,
    {
        let id = self.ids.next_id();
        let snapshot = self.get_session_state(session_id);
        let listeners = self
            .session_listeners
            .entry(session_id.to_string())
            .or_default();
        listeners.insert(id, Box::new(listener));
        listeners.notify_one(LOG, id, &snapshot);
        self.subscription_sessions.insert(id, session_id.to_string());
        id
    }

    /// Remove a global or per-session subscription
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if self.global_listeners.remove(id) {
            return true;
        }
        let Some(session_id) = self.subscription_sessions.remove(&id) else {
            return false;
        };
        if let Some(listeners) = self.session_listeners.get_mut(&session_id) {
            listeners.remove(id);
            if listeners.is_empty() {
                self.session_listeners.remove(&session_id);
            }
        }
        true
    }

    fn notify(&mut self, session_id: &str) {
        if let Some(listeners) = self.session_listeners.get_mut(session_id) {
            let snapshot = self.sessions.get(session_id).cloned();
            listeners.notify(LOG, &snapshot);
        }

        let loading_ids = self.get_loading_session_ids();
        if loading_ids != self.last_loading_ids {
            self.global_listeners.notify(LOG, &loading_ids);
            self.last_loading_ids = loading_ids;
        }
    }
}
