//! Thread-safe task queue and timer heap backing one event loop.
//!
//! Provides a FIFO queue for tasks submitted with `execute`, a deadline-ordered
//! timer heap, and a park/unpark mechanism so the loop thread sleeps until there
//! is something to do.

use crate::event_loop::Task;
use crate::time::{TimerDriver, TimerHandle};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Tasks and timers waiting to run on a loop.
///
/// Every mutation wakes the parked loop thread.
pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    wakeup: Condvar,
    shutdown: AtomicBool,
}

struct QueueState {
    tasks: VecDeque<Task>,
    timers: TimerDriver,
    // Set by `notify` so a wake-up between two parks is not lost.
    notified: bool,
}

impl TaskQueue {
    /// Creates an empty queue.
    ///
    /// Initializes the task deque and timer heap behind one lock, with shutdown unset.
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                timers: TimerDriver::new(),
                notified: false,
            }),
            wakeup: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Enqueues a task at the back of the queue.
    ///
    /// Wakes the parked loop thread so the task runs on its next pass.
    ///
    /// # Arguments
    /// * `task` - The task to enqueue
    ///
    /// # Returns
    /// `false` if the queue was shut down; the task is dropped without running.
    pub(crate) fn push(&self, task: Task) -> bool {
        let mut state = self.state.lock();
        if self.is_shutdown() {
            return false;
        }

        state.tasks.push_back(task);
        drop(state);

        self.wakeup.notify_one();
        true
    }

    /// Registers `task` to be released from the queue at `deadline`.
    ///
    /// After shutdown the returned timer is already cancelled.
    ///
    /// # Arguments
    /// * `deadline` - The instant the task becomes due
    /// * `task` - The task to run once due
    ///
    /// # Returns
    /// The gate used to cancel the timer
    pub(crate) fn schedule(&self, deadline: Instant, task: Task) -> TimerHandle {
        let mut state = self.state.lock();
        if self.is_shutdown() {
            let timer = TimerHandle::new();
            timer.cancel();
            return timer;
        }

        let timer = state.timers.register(deadline, task);
        drop(state);

        self.wakeup.notify_one();
        timer
    }

    /// Dequeues the next ready task.
    ///
    /// # Returns
    /// Some(task) if a task is queued, None otherwise
    pub(crate) fn pop(&self) -> Option<Task> {
        self.state.lock().tasks.pop_front()
    }

    /// Number of tasks currently queued (timers excluded).
    ///
    /// # Returns
    /// The queue length at the time of the call
    pub(crate) fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Checks if the task queue is empty.
    ///
    /// # Returns
    /// true if no tasks are queued, false otherwise
    pub(crate) fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Takes the tasks of every timer due at `now`.
    ///
    /// # Arguments
    /// * `now` - The instant to compare deadlines against
    ///
    /// # Returns
    /// The due tasks, in deadline order
    pub(crate) fn take_expired(&self, now: Instant) -> Vec<Task> {
        self.state.lock().timers.expired(now)
    }

    /// Wakes a parked loop thread even if nothing was queued.
    pub(crate) fn notify(&self) {
        self.state.lock().notified = true;
        self.wakeup.notify_all();
    }

    /// Blocks until a task is queued, a timer is due, `notify` is called, the queue
    /// shuts down, or `limit` elapses.
    ///
    /// Returns at once if a notification arrived since the last park.
    ///
    /// # Arguments
    /// * `limit` - Upper bound on the wait; `None` waits for the next event only
    pub(crate) fn park(&self, limit: Option<Duration>) {
        let mut state = self.state.lock();

        if !state.tasks.is_empty() || state.notified || self.is_shutdown() {
            state.notified = false;
            return;
        }

        let until_timer = state.timers.next_remaining(Instant::now());
        let timeout = match (limit, until_timer) {
            (Some(limit), Some(until_timer)) => Some(limit.min(until_timer)),
            (limit, until_timer) => limit.or(until_timer),
        };

        match timeout {
            Some(timeout) if timeout.is_zero() => {}
            Some(timeout) => {
                self.wakeup.wait_for(&mut state, timeout);
            }
            None => self.wakeup.wait(&mut state),
        }

        state.notified = false;
    }

    /// Stops accepting work and wakes the loop thread.
    ///
    /// # Returns
    /// The tasks and timers that never ran. Callers drop them outside the queue lock,
    /// since dropping a task may settle promises that enqueue more work.
    pub(crate) fn shutdown(&self) -> Vec<Task> {
        self.shutdown.store(true, Ordering::SeqCst);

        let mut state = self.state.lock();
        let mut abandoned: Vec<Task> = state.tasks.drain(..).collect();
        abandoned.extend(state.timers.clear());
        drop(state);

        self.wakeup.notify_all();
        abandoned
    }

    /// Checks if shutdown has been requested.
    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
