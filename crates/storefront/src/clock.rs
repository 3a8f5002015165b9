//! Virtual-time timers for deterministic page behavior.
//!
//! Stands in for `setTimeout`/`clearTimeout`. Time only moves when the host
//! advances it, so delayed work (cart latency, label resets, debounced
//! handlers) runs at exactly the same virtual instant on every run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Handle returned by [`Scheduler::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

/// Queue of tasks keyed by virtual due time
///
/// Tasks due at the same instant run in scheduling order.
#[derive(Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_seq: u64,
    queue: BTreeMap<(u64, u64), T>,
    due_by_id: HashMap<u64, u64>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler at time zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    /// Current virtual time in milliseconds
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Run `task` after `delay_ms`
    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let due = self.now_ms.saturating_add(delay_ms);
        self.queue.insert((due, seq), task);
        self.due_by_id.insert(seq, due);
        TimerId(seq)
    }

    /// Cancel a pending task; returns it if it had not run yet
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let due = self.due_by_id.remove(&id.0)?;
        self.queue.remove(&(due, id.0))
    }

    /// Pop the next task due at or before `deadline_ms`, moving the clock to
    /// its due time
    pub fn pop_due(&mut self, deadline_ms: u64) -> Option<T> {
        let (&(due, seq), _) = self.queue.first_key_value()?;
        if due > deadline_ms {
            return None;
        }
        self.due_by_id.remove(&seq);
        self.now_ms = self.now_ms.max(due);
        self.queue.remove(&(due, seq))
    }

    /// Move the clock forward to `deadline_ms` once due tasks are drained
    pub fn settle(&mut self, deadline_ms: u64) {
        self.now_ms = self.now_ms.max(deadline_ms);
    }

    /// Due time of the earliest pending task
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Number of pending tasks
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether a timer is still pending
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due_by_id.contains_key(&id.0)
    }
}

/// Collapses bursts of calls into one task run `wait_ms` after the last call
#[derive(Debug, Clone)]
pub struct Debouncer {
    wait_ms: u64,
    pending: Option<TimerId>,
}

impl Debouncer {
    /// Create a debouncer
    #[must_use]
    pub const fn new(wait_ms: u64) -> Self {
        Self {
            wait_ms,
            pending: None,
        }
    }

    /// Wait time
    #[must_use]
    pub const fn wait_ms(&self) -> u64 {
        self.wait_ms
    }

    /// Restart the timer with `task`, dropping any pending one
    pub fn call<T>(&mut self, scheduler: &mut Scheduler<T>, task: T) -> TimerId {
        if let Some(previous) = self.pending.take() {
            scheduler.cancel(previous);
        }
        let id = scheduler.schedule(self.wait_ms, task);
        self.pending = Some(id);
        id
    }

    /// Mark the pending task as run
    pub fn fired(&mut self) {
        self.pending = None;
    }

    /// Whether a call is waiting to fire
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Lets the first call through and drops the rest for `limit_ms`
#[derive(Debug, Clone)]
pub struct Throttler {
    limit_ms: u64,
    blocked_until: Option<u64>,
}

impl Throttler {
    /// Create a throttler; a zero limit passes every call
    #[must_use]
    pub const fn new(limit_ms: u64) -> Self {
        Self {
            limit_ms,
            blocked_until: None,
        }
    }

    /// Whether a call at `now_ms` may run
    pub fn try_pass(&mut self, now_ms: u64) -> bool {
        if self.limit_ms == 0 {
            return true;
        }
        if self.blocked_until.is_some_and(|until| now_ms < until) {
            return false;
        }
        self.blocked_until = Some(now_ms.saturating_add(self.limit_ms));
        true
    }
}
