//! Timer Arena
//!
//! Keyed, cancellable delayed tasks. The arena holds at most one timer per
//! key: scheduling an already-armed key replaces its deadline, which is how
//! a newer event supersedes a pending clear. Nothing fires on its own; the
//! owner calls [`TimerArena::take_due`] with the current time and acts on the
//! returned keys.

use std::collections::HashMap;
use std::hash::Hash;

/// Identity of one scheduled timer. A rescheduled key gets a new token, so a
/// token held from an earlier schedule no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    deadline_ms: i64,
    token: TimerToken,
}

/// A set of pending timers keyed by `K`.
#[derive(Debug)]
pub struct TimerArena<K> {
    entries: HashMap<K, TimerEntry>,
    next_token: u64,
}

impl<K> Default for TimerArena<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_token: 0,
        }
    }
}

impl<K: Eq + Hash + Clone> TimerArena<K> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer for `key` to fire at `deadline_ms`.
    pub fn schedule(&mut self, key: K, deadline_ms: i64) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.entries.insert(key, TimerEntry { deadline_ms, token });
        token
    }

    /// Disarm the timer for `key`. Returns whether one was armed.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Disarm every timer whose key matches `predicate`.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        before - self.entries.len()
    }

    /// Whether a timer is armed for `key`.
    pub fn is_scheduled(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Deadline of the timer armed for `key`, if any.
    pub fn deadline(&self, key: &K) -> Option<i64> {
        self.entries.get(key).map(|e| e.deadline_ms)
    }

    /// Token of the timer armed for `key`, if any.
    pub fn token(&self, key: &K) -> Option<TimerToken> {
        self.entries.get(key).map(|e| e.token)
    }

    /// Earliest armed deadline.
    pub fn next_deadline(&self) -> Option<i64> {
        self.entries.values().map(|e| e.deadline_ms).min()
    }

    /// Remove and return every timer due at `now_ms`, earliest first.
    /// Ties are broken by scheduling order.
    pub fn take_due(&mut self, now_ms: i64) -> Vec<(K, TimerToken)> {
        let mut due: Vec<(K, TimerEntry)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.deadline_ms <= now_ms)
            .map(|(k, e)| (k.clone(), *e))
            .collect();
        due.sort_by_key(|(_, e)| (e.deadline_ms, e.token.0));

        for (key, _) in &due {
            self.entries.remove(key);
        }
        due.into_iter().map(|(k, e)| (k, e.token)).collect()
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Disarm everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
