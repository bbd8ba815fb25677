use foundation::time::Time;

use crate::timers::{TimerId, TimerQueue};

/// Virtual-clock event loop.
///
/// The host advances time explicitly; tasks come back out in due order and
/// the clock jumps to each task's due time as it is popped. This is the
/// primary timebase for deferred work so every flow can be replayed.
#[derive(Debug)]
pub struct EventLoop<T> {
    now: Time,
    timers: TimerQueue<T>,
}

impl<T> Default for EventLoop<T> {
    fn default() -> Self {
        Self {
            now: Time::ZERO,
            timers: TimerQueue::new(),
        }
    }
}

impl<T> EventLoop<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Time {
        self.now
    }

    /// Runs `task` once `delay_ms` has elapsed.
    pub fn defer(&mut self, delay_ms: u64, task: T) -> TimerId {
        self.timers.schedule(self.now.after(delay_ms), task)
    }

    /// Runs `task` on the next turn of the loop, after the current handler returns.
    pub fn next_tick(&mut self, task: T) -> TimerId {
        self.defer(0, task)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn clear(&mut self) -> usize {
        self.timers.clear()
    }

    pub fn next_due(&self) -> Option<Time> {
        self.timers.next_due()
    }

    /// Pops the next task due no later than `until`, moving the clock to its due time.
    pub fn pop_due(&mut self, until: Time) -> Option<T> {
        let (_id, due, task) = self.timers.pop_due(until)?;
        if due > self.now {
            self.now = due;
        }
        Some(task)
    }

    /// Moves the clock forward to `until`. The clock never runs backwards.
    pub fn settle_at(&mut self, until: Time) {
        if until > self.now {
            self.now = until;
        }
    }
}
