//! Listener Registry
//!
//! Ordered set of synchronous callbacks shared by the state managers.
//! A panicking listener is logged and skipped; the others still run.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Handle returned by every `subscribe`/`on` call, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Callback receiving a borrowed snapshot.
pub type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// Source of unique subscription ids for one manager.
#[derive(Debug, Default)]
pub struct SubscriptionIds {
    next: u64,
}

impl SubscriptionIds {
    pub fn next_id(&mut self) -> SubscriptionId {
        self.next += 1;
        SubscriptionId(self.next)
    }
}

/// Listeners in registration order.
pub struct ListenerSet<T> {
    entries: Vec<(SubscriptionId, Listener<T>)>,
}

impl<T> std::fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ListenerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SubscriptionId, listener: Listener<T>) {
        self.entries.push((id, listener));
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        before != self.entries.len()
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Call every listener with `value`. `context` names the emitter in logs.
    pub fn notify(&mut self, context: &str, value: &T) {
        for (id, listener) in self.entries.iter_mut() {
            deliver(context, *id, listener, value);
        }
    }

    /// Call a single listener, used for the snapshot delivered on subscribe.
    pub fn notify_one(&mut self, context: &str, id: SubscriptionId, value: &T) {
        if let Some((id, listener)) = self.entries.iter_mut().find(|(entry_id, _)| *entry_id == id) {
            deliver(context, *id, listener, value);
        }
    }
}

fn deliver<T>(
    context: &str,
    id: SubscriptionId,
    listener: &mut Listener<T>,
    value: &T,
) {
    if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
        tracing::error!("[{}] Listener {} panicked; continuing", context, id.as_u64());
    }
}
