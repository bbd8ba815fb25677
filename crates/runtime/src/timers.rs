//! Deterministic timer queue for single-threaded deferred callbacks.
//!
//! Key properties:
//! - Total ordering on `(due, id)`.
//! - Timers due at the same instant fire in scheduling order.
//! - Cancellation does not perturb the order of remaining timers.
//!
//! Vec-backed: a mounted view keeps at most a handful of timers alive.

use foundation::time::Time;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    due: Time,
    id: TimerId,
}

#[derive(Debug)]
struct Item<T> {
    key: Key,
    payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    items: Vec<Item<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            items: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn schedule(&mut self, due: Time, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.items.push(Item {
            key: Key { due, id },
            payload,
        });
        id
    }

    /// Returns `true` if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.key.id != id);
        self.items.len() != before
    }

    /// Drops every pending timer and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }

    /// Earliest due time among pending timers.
    pub fn next_due(&self) -> Option<Time> {
        self.items.iter().map(|i| i.key.due).min()
    }

    /// Pops the earliest timer if it is due at or before `now`.
    pub fn pop_due(&mut self, now: Time) -> Option<(TimerId, Time, T)> {
        let mut best_idx: Option<usize> = None;
        for (idx, item) in self.items.iter().enumerate() {
            if item.key.due > now {
                continue;
            }
            match best_idx {
                None => best_idx = Some(idx),
                Some(best) => {
                    if item.key < self.items[best].key {
                        best_idx = Some(idx);
                    }
                }
            }
        }

        let idx = best_idx?;
        let item = self.items.swap_remove(idx);
        Some((item.key.id, item.key.due, item.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;
    use foundation::time::Time;

    #[test]
    fn same_due_time_is_scheduling_order() {
        let mut q = TimerQueue::new();
        q.schedule(Time(10), "a");
        q.schedule(Time(10), "b");
        q.schedule(Time(10), "c");

        let (_, _, a) = q.pop_due(Time(10)).unwrap();
        let (_, _, b) = q.pop_due(Time(10)).unwrap();
        let (_, _, c) = q.pop_due(Time(10)).unwrap();
        assert_eq!((a, b, c), ("a", "b", "c"));
    }

    #[test]
    fn earlier_due_fires_first_and_future_timers_wait() {
        let mut q = TimerQueue::new();
        q.schedule(Time(500), "late");
        q.schedule(Time(100), "early");

        assert!(q.pop_due(Time(99)).is_none());
        let (_, due, v) = q.pop_due(Time(1000)).unwrap();
        assert_eq!((due, v), (Time(100), "early"));
        assert_eq!(q.next_due(), Some(Time(500)));
    }

    #[test]
    fn cancel_removes_timer() {
        let mut q = TimerQueue::new();
        let a = q.schedule(Time(0), "a");
        q.schedule(Time(0), "b");
        assert!(q.cancel(a));
        assert!(!q.cancel(a));

        let (_, _, v) = q.pop_due(Time(0)).unwrap();
        assert_eq!(v, "b");
        assert!(q.pop_due(Time(0)).is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let mut q = TimerQueue::new();
        q.schedule(Time(1), 1);
        q.schedule(Time(2), 2);
        assert_eq!(q.clear(), 2);
        assert!(q.is_empty());
        assert_eq!(q.next_due(), None);
    }
}
