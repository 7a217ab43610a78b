//! Cancellable timers and the deadline-ordered driver that fires them.
//!
//! Every timer is guarded by a [`TimerHandle`], a three-state gate
//! (`armed`, `fired`, `cancelled`). Firing and cancelling both race for the single
//! transition out of `armed`, so a task either runs or is cancelled, never both.
//!
//! A gate created by the [`TimerDriver`] also owns the timer's task. Cancelling
//! drops the task on the spot, so whatever it captured is released right away; only
//! a small heap entry stays behind and is discarded when it reaches the front of
//! the min-heap.

use crate::event_loop::Task;

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared gate deciding whether a timer fires or is cancelled.
///
/// Cloning the handle shares the gate.
#[derive(Clone)]
pub struct TimerHandle {
    gate: Arc<Gate>,
}

struct Gate {
    state: AtomicU8,
    // Present only for timers registered with a `TimerDriver`.
    task: Mutex<Option<Task>>,
}

impl TimerHandle {
    /// Creates an armed timer gate.
    ///
    /// [`Clock`](crate::Clock) implementations hand one out per scheduled callback.
    pub fn new() -> Self {
        Self::with_task(None)
    }

    fn with_task(task: Option<Task>) -> Self {
        Self {
            gate: Arc::new(Gate {
                state: AtomicU8::new(ARMED),
                task: Mutex::new(task),
            }),
        }
    }

    /// Cancels the timer.
    ///
    /// Returns `false` if it already fired or was already cancelled; in that case
    /// nothing changes. A task owned by the gate is dropped immediately.
    pub fn cancel(&self) -> bool {
        if !self.transition(CANCELLED) {
            return false;
        }

        let task = self.gate.task.lock().take();
        drop(task);
        true
    }

    /// Claims the right to run the timer's callback.
    ///
    /// Returns `false` if the timer was cancelled (or already fired).
    pub fn fire(&self) -> bool {
        self.transition(FIRED)
    }

    /// Returns `true` while the timer is neither fired nor cancelled.
    pub fn is_armed(&self) -> bool {
        self.gate.state.load(Ordering::Acquire) == ARMED
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.state.load(Ordering::Acquire) == CANCELLED
    }

    // Removes the owned task without touching the gate state.
    fn take_task(&self) -> Option<Task> {
        self.gate.task.lock().take()
    }

    fn transition(&self, to: u8) -> bool {
        self.gate
            .state
            .compare_exchange(ARMED, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.gate.state.load(Ordering::Acquire) {
            ARMED => "armed",
            FIRED => "fired",
            _ => "cancelled",
        };
        f.debug_struct("TimerHandle").field("state", &state).finish()
    }
}

struct Entry {
    deadline: Instant,
    // Registration order, so equal deadlines fire first-in first-out.
    seq: u64,
    timer: TimerHandle,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the BinaryHeap pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Deadline-ordered set of timers.
///
/// Not synchronised; owners keep it behind their own lock.
pub(crate) struct TimerDriver {
    timers: BinaryHeap<Entry>,
    next_seq: u64,
}

impl TimerDriver {
    /// Creates an empty timer driver.
    pub(crate) fn new() -> Self {
        Self {
            timers: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Registers `task` to fire at `deadline`.
    ///
    /// The task is stored in the returned gate, so cancelling releases it.
    ///
    /// # Arguments
    /// * `deadline` - The instant the timer becomes due
    /// * `task` - The callback to hand out once due
    ///
    /// # Returns
    /// The gate used to cancel the timer.
    pub(crate) fn register(&mut self, deadline: Instant, task: Task) -> TimerHandle {
        let timer = TimerHandle::with_task(Some(task));
        self.timers.push(Entry {
            deadline,
            seq: self.next_seq,
            timer: timer.clone(),
        });
        self.next_seq += 1;

        timer
    }

    /// Removes every timer due at `now` and returns the tasks that won their gate.
    ///
    /// Tasks are returned in deadline order. Cancelled timers are dropped.
    pub(crate) fn expired(&mut self, now: Instant) -> Vec<Task> {
        let mut due = Vec::new();

        while let Some(entry) = self.timers.peek() {
            if entry.deadline > now {
                break;
            }

            if let Some(entry) = self.timers.pop()
                && entry.timer.fire()
                && let Some(task) = entry.timer.take_task()
            {
                due.push(task);
            }
        }

        due
    }

    /// Returns the earliest deadline among armed timers.
    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(entry) = self.timers.peek() {
            if entry.timer.is_armed() {
                return Some(entry.deadline);
            }
            self.timers.pop();
        }

        None
    }

    /// Returns the time remaining until the next armed deadline, if any.
    pub(crate) fn next_remaining(&mut self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Returns `true` if at least one timer is still armed.
    pub(crate) fn has_pending(&mut self) -> bool {
        self.next_deadline().is_some()
    }

    /// Cancels every registered timer.
    ///
    /// # Returns
    /// The tasks of the timers that were still armed, so the caller can drop them
    /// outside its lock.
    pub(crate) fn clear(&mut self) -> Vec<Task> {
        self.timers
            .drain()
            .filter_map(|entry| {
                // Taken first so `cancel` has nothing left to drop here.
                let task = entry.timer.take_task();
                entry.timer.cancel();
                task
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Task {
        let log = log.clone();
        Box::new(move || log.lock().unwrap().push(value))
    }

    #[test]
    fn test_gate_fires_once() {
        let timer = TimerHandle::new();

        assert!(timer.fire());
        assert!(!timer.fire());
        assert!(!timer.cancel(), "Cancelling a fired timer should be a no-op");
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_gate_cancel_blocks_fire() {
        let timer = TimerHandle::new();

        assert!(timer.cancel());
        assert!(timer.is_cancelled());
        assert!(!timer.fire(), "A cancelled timer must never fire");
    }

    #[test]
    fn test_driver_fires_in_deadline_order() {
        let mut driver = TimerDriver::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        driver.register(start + Duration::from_millis(30), recorder(&log, 3));
        driver.register(start + Duration::from_millis(10), recorder(&log, 1));
        driver.register(start + Duration::from_millis(20), recorder(&log, 2));
        driver.register(start + Duration::from_millis(10), recorder(&log, 11));

        for task in driver.expired(start + Duration::from_millis(25)) {
            task();
        }

        assert_eq!(*log.lock().unwrap(), vec![1, 11, 2]);
        assert_eq!(
            driver.next_remaining(start + Duration::from_millis(25)),
            Some(Duration::from_millis(5))
        );
    }

    #[test]
    fn test_driver_skips_cancelled() {
        let mut driver = TimerDriver::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        let first = driver.register(start + Duration::from_millis(10), recorder(&log, 1));
        driver.register(start + Duration::from_millis(20), recorder(&log, 2));

        assert!(first.cancel());
        assert_eq!(driver.next_deadline(), Some(start + Duration::from_millis(20)));

        for task in driver.expired(start + Duration::from_millis(50)) {
            task();
        }

        assert_eq!(*log.lock().unwrap(), vec![2]);
        assert!(!driver.has_pending());
    }

    #[test]
    fn test_cancel_releases_task_immediately() {
        let mut driver = TimerDriver::new();
        let captured = Arc::new(());
        let held = captured.clone();
        let start = Instant::now();

        let timer = driver.register(
            start + Duration::from_secs(3600),
            Box::new(move || drop(held)),
        );
        assert_eq!(Arc::strong_count(&captured), 2);

        assert!(timer.cancel());
        assert_eq!(
            Arc::strong_count(&captured),
            1,
            "Cancelling should drop the task before its deadline"
        );
        assert!(driver.expired(start + Duration::from_secs(7200)).is_empty());
    }

    #[test]
    fn test_clear_returns_only_armed_tasks() {
        let mut driver = TimerDriver::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        let cancelled = driver.register(start, recorder(&log, 1));
        let armed = driver.register(start, recorder(&log, 2));
        assert!(cancelled.cancel());

        assert_eq!(driver.clear().len(), 1);
        assert!(armed.is_cancelled());
    }
}
