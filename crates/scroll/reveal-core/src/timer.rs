//! Single-threaded timer queue driven by the host frame clock.

use crate::ids::{IdAllocator, TimerId};

#[derive(Debug)]
struct Pending<T> {
    id: TimerId,
    due_ms: f64,
    payload: T,
}

/// Deadline queue. Timers fire from [`TimerQueue::drain_due`] in due order,
/// ties broken by scheduling order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    ids: IdAllocator,
    pending: Vec<Pending<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            ids: IdAllocator::new(),
            pending: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: f64, payload: T) -> TimerId {
        let id = self.ids.alloc_timer();
        // keep sorted by due time; equal deadlines stay in insertion order
        let at = self.pending.partition_point(|p| p.due_ms <= due_ms);
        self.pending.insert(
            at,
            Pending {
                id,
                due_ms,
                payload,
            },
        );
        id
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.pending.iter().position(|p| p.id == id) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every timer due at or before `now_ms`.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<(TimerId, T)> {
        let split = self.pending.partition_point(|p| p.due_ms <= now_ms);
        self.pending
            .drain(..split)
            .map(|p| (p.id, p.payload))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut q = TimerQueue::new();
        q.schedule(30.0, "c");
        q.schedule(10.0, "a");
        q.schedule(10.0, "b");
        let fired: Vec<_> = q.drain_due(20.0).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["a", "b"]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TimerQueue::new();
        let id = q.schedule(50.0, ());
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
        assert!(q.drain_due(100.0).is_empty());
    }
}
