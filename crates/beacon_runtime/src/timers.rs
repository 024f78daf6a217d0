use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use beacon_core::{TimerId, Timestamp};

/// Single-shot timers ordered by deadline, then by arming order.
///
/// Cancellation is lazy: cancelled entries are skipped when they reach the
/// front of the heap.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(Timestamp, u64, TimerId)>>,
    cancelled: HashSet<TimerId>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, timer: TimerId, deadline: Timestamp) {
        self.cancelled.remove(&timer);
        self.heap.push(Reverse((deadline, self.next_seq, timer)));
        self.next_seq += 1;
    }

    pub fn cancel(&mut self, timer: TimerId) {
        if self
            .heap
            .iter()
            .any(|Reverse((_, _, armed))| *armed == timer)
        {
            self.cancelled.insert(timer);
        }
    }

    /// Removes and returns the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<(TimerId, Timestamp)> {
        self.skip_cancelled();
        let Reverse((deadline, _, timer)) = *self.heap.peek()?;
        if deadline > now {
            return None;
        }
        self.heap.pop();
        Some((timer, deadline))
    }

    pub fn next_deadline(&mut self) -> Option<Timestamp> {
        self.skip_cancelled();
        self.heap.peek().map(|Reverse((deadline, _, _))| *deadline)
    }

    pub fn len(&self) -> usize {
        self.heap.len() - self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn skip_cancelled(&mut self) {
        while let Some(Reverse((_, _, timer))) = self.heap.peek() {
            let timer = *timer;
            if !self.cancelled.remove(&timer) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_then_arming_order() {
        let mut queue = TimerQueue::new();
        queue.arm(TimerId(1), 50);
        queue.arm(TimerId(2), 10);
        queue.arm(TimerId(3), 50);

        assert_eq!(queue.pop_due(5), None);
        assert_eq!(queue.pop_due(100), Some((TimerId(2), 10)));
        assert_eq!(queue.pop_due(100), Some((TimerId(1), 50)));
        assert_eq!(queue.pop_due(100), Some((TimerId(3), 50)));
        assert_eq!(queue.pop_due(100), None);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut queue = TimerQueue::new();
        queue.arm(TimerId(1), 10);
        queue.arm(TimerId(2), 20);
        queue.cancel(TimerId(1));
        queue.cancel(TimerId(9));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_deadline(), Some(20));
        assert_eq!(queue.pop_due(100), Some((TimerId(2), 20)));
        assert!(queue.is_empty());
    }
}
