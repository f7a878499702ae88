//! Delta-list timer queue.
//!
//! Grounded directly on `BasicUsageEnvironment/DelayQueue.cpp`: entries are
//! kept in firing order, but each stores only the delay *relative to the
//! entry before it* (`delta_remaining`), not an absolute fire time. That
//! makes `time_until_next()` O(1) (just look at the head) and makes
//! `sync()` only do work proportional to the number of entries that are
//! actually due, instead of rescanning everything on every tick.

use std::collections::VecDeque;

use crate::time::{DelayInterval, EventTime};

/// Stable handle to a scheduled timer, returned by [`TimerQueue::schedule`]
/// and required by [`TimerQueue::cancel`]/[`TimerQueue::reschedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

struct TimerEntry {
    token: TaskToken,
    delta_remaining: DelayInterval,
    callback: Box<dyn FnOnce()>,
}

impl std::fmt::Debug for TimerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEntry")
            .field("token", &self.token)
            .field("delta_remaining", &self.delta_remaining)
            .finish()
    }
}

/// A delta-list of pending one-shot timers.
///
/// `entries` is ordered by firing time; `entries[0].delta_remaining` is the
/// time from "now" (as of the last [`sync`](Self::sync)) until the head
/// fires, and every later entry's delta is relative to the one before it.
/// Summing deltas up to index `i` gives entry `i`'s absolute remaining time.
pub struct TimerQueue {
    entries: VecDeque<TimerEntry>,
    next_token: u64,
    last_sync: EventTime,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        TimerQueue {
            entries: VecDeque::new(),
            next_token: 0,
            last_sync: EventTime::now(),
        }
    }

    fn alloc_token(&mut self) -> TaskToken {
        let token = TaskToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        token
    }

    /// Schedules `callback` to run after `delay`, ages the list by the time
    /// elapsed since the last sync first so the new entry's position is
    /// computed against a fresh baseline.
    pub fn schedule(
        &mut self,
        delay: DelayInterval,
        callback: Box<dyn FnOnce()>,
    ) -> TaskToken {
        self.sync_now();
        let token = self.alloc_token();
        let mut remaining = delay;
        let mut insert_at = self.entries.len();
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if remaining >= entry.delta_remaining {
                remaining = remaining - entry.delta_remaining;
            } else {
                entry.delta_remaining = entry.delta_remaining - remaining;
                insert_at = i;
                break;
            }
        }
        self.entries.insert(
            insert_at,
            TimerEntry {
                token,
                delta_remaining: remaining,
                callback,
            },
        );
        token
    }

    /// Removes a scheduled timer before it fires. Conserves the absolute
    /// fire times of every later entry by folding the removed delta back
    /// into its successor, exactly as `DelayQueue::removeEntry` does.
    pub fn cancel(&mut self, token: TaskToken) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.token == token) else {
            return false;
        };
        let removed = self.entries.remove(pos).unwrap();
        if let Some(next) = self.entries.get_mut(pos) {
            next.delta_remaining = next.delta_remaining + removed.delta_remaining;
        }
        true
    }

    /// Cancels `token` (if present) and reschedules it with a fresh delay,
    /// mirroring `DelayQueue::updateEntry`.
    pub fn reschedule(
        &mut self,
        token: TaskToken,
        new_delay: DelayInterval,
        callback: Box<dyn FnOnce()>,
    ) -> TaskToken {
        self.cancel(token);
        self.schedule(new_delay, callback)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Time until the head entry fires. Fast path mirrors
    /// `DelayQueue::timeToNextAlarm`: if the head is already due (delta <=
    /// 0) there is no need to touch the wall clock at all.
    pub fn time_until_next(&mut self) -> DelayInterval {
        match self.entries.front() {
            None => DelayInterval::ETERNITY,
            Some(head) if head.delta_remaining.is_zero_or_negative() => DelayInterval::ZERO,
            Some(_) => {
                self.sync_now();
                self.entries
                    .front()
                    .map(|e| e.delta_remaining)
                    .unwrap_or(DelayInterval::ETERNITY)
            }
        }
    }

    fn sync_now(&mut self) {
        let now = EventTime::now();
        self.sync(now);
    }

    /// Ages the list by the wall-clock time elapsed since the last sync,
    /// zeroing out (but not popping) every head entry that has become due.
    ///
    /// A clock that has moved backwards resets the anchor without touching
    /// any queued delta — per the design note this preserves relative
    /// ordering rather than trying to "un-age" entries that may already
    /// have been consumed.
    pub fn sync(&mut self, now: EventTime) {
        let elapsed = now.elapsed_since(self.last_sync);
        self.last_sync = now;
        if elapsed.is_zero_or_negative() {
            return;
        }
        let mut remaining = elapsed;
        for entry in self.entries.iter_mut() {
            if remaining.is_zero_or_negative() {
                break;
            }
            if remaining >= entry.delta_remaining {
                remaining = remaining - entry.delta_remaining;
                entry.delta_remaining = DelayInterval::ZERO;
            } else {
                entry.delta_remaining = entry.delta_remaining - remaining;
                break;
            }
        }
    }

    /// Fires the head entry if (after syncing) it is due, popping it. Fires
    /// at most one entry, matching the single-step loop's "one timer per
    /// iteration" rule.
    pub fn handle_alarm(&mut self) {
        if self
            .entries
            .front()
            .is_some_and(|e| !e.delta_remaining.is_zero_or_negative())
        {
            self.sync_now();
        }
        if self
            .entries
            .front()
            .is_some_and(|e| e.delta_remaining.is_zero_or_negative())
        {
            let entry = self.entries.pop_front().unwrap();
            (entry.callback)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fires_in_scheduled_order() {
        let mut q = TimerQueue::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (o1, o2) = (order.clone(), order.clone());
        q.schedule(DelayInterval::ZERO, Box::new(move || o1.borrow_mut().push(1)));
        q.schedule(DelayInterval::ZERO, Box::new(move || o2.borrow_mut().push(2)));
        q.handle_alarm();
        q.handle_alarm();
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn cancel_conserves_successor_absolute_time() {
        let mut q = TimerQueue::new();
        let fired = Rc::new(RefCell::new(false));
        let fired2 = fired.clone();
        let a = q.schedule(DelayInterval::from_millis(10), Box::new(|| {}));
        q.schedule(
            DelayInterval::from_millis(20),
            Box::new(move || *fired2.borrow_mut() = true),
        );
        assert!(q.cancel(a));
        // total remaining delta across the list should still sum to ~20ms
        let total: i64 = q_total_micros(&q);
        assert!((19_000..=21_000).contains(&total), "total={total}");
    }

    fn q_total_micros(q: &TimerQueue) -> i64 {
        q.entries.iter().map(|e| e.delta_remaining.as_micros()).sum()
    }

    #[test]
    fn empty_queue_time_until_next_is_eternity() {
        let mut q = TimerQueue::new();
        assert_eq!(q.time_until_next(), DelayInterval::ETERNITY);
    }

    #[test]
    fn due_entry_reports_zero_wait() {
        let mut q = TimerQueue::new();
        q.schedule(DelayInterval::ZERO, Box::new(|| {}));
        assert_eq!(q.time_until_next(), DelayInterval::ZERO);
    }

    #[test]
    fn clock_regression_resets_anchor_without_adjusting_deltas() {
        let mut q = TimerQueue::new();
        q.schedule(DelayInterval::from_millis(100), Box::new(|| {}));
        let before = q_total_micros(&q);
        let earlier = EventTime::now();
        // Simulate a backwards jump by syncing with a timestamp "now" that
        // predates the queue's anchor: elapsed is negative, so sync()
        // should leave every delta untouched.
        q.last_sync = earlier;
        q.sync(earlier);
        assert_eq!(q_total_micros(&q), before);
    }

    #[test]
    fn handle_alarm_fires_at_most_one_entry() {
        let mut q = TimerQueue::new();
        let count = Rc::new(RefCell::new(0));
        for _ in 0..3 {
            let c = count.clone();
            q.schedule(DelayInterval::ZERO, Box::new(move || *c.borrow_mut() += 1));
        }
        q.handle_alarm();
        assert_eq!(*count.borrow(), 1);
        assert_eq!(q.len(), 2);
    }
}
