//! Clock capability used by the main event loop for deadline scheduling.
//!
//! A [`Clock`] tells the time and fires callbacks at absolute deadlines. The main
//! loop only talks to its timer facility through this trait, so tests can swap in
//! a [`ManualClock`] and advance time by hand.
//!
//! # Example
//! ```ignore
//! use eventloop::{Clock, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let timer = clock.schedule_once(clock.now() + Duration::from_secs(5), Box::new(|| {
//!     println!("five virtual seconds later");
//! }));
//!
//! clock.advance(Duration::from_secs(5));
//! assert!(!timer.is_armed());
//! ```

use crate::event_loop::Task;
use crate::time::{TimerDriver, TimerHandle};

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

/// Monotonic time source with one-shot deadline callbacks.
pub trait Clock: Send + Sync + 'static {
    /// Current monotonic time.
    fn now(&self) -> Instant;

    /// Calls `callback` once `deadline` has passed, unless the returned handle is
    /// cancelled first.
    fn schedule_once(&self, deadline: Instant, callback: Task) -> TimerHandle;
}

/// A clock that only moves when told to.
///
/// Callbacks run synchronously inside [`advance`](ManualClock::advance), on the
/// calling thread.
pub struct ManualClock {
    state: Mutex<ManualState>,
}

struct ManualState {
    now: Instant,
    timers: TimerDriver,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Instant::now(),
                timers: TimerDriver::new(),
            }),
        }
    }

    /// Moves time forward by `by` and fires every timer that became due.
    ///
    /// # Returns
    /// The number of callbacks that ran.
    pub fn advance(&self, by: Duration) -> usize {
        let due = {
            let mut state = self.state.lock();
            state.now += by;
            let now = state.now;
            state.timers.expired(now)
        };

        trace!(fired = due.len(), "manual clock advanced");

        let fired = due.len();
        for callback in due {
            callback();
        }
        fired
    }

    /// Returns `true` if any timer is still armed.
    pub fn has_pending(&self) -> bool {
        self.state.lock().timers.has_pending()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state.lock().now
    }

    fn schedule_once(&self, deadline: Instant, callback: Task) -> TimerHandle {
        self.state.lock().timers.register(deadline, callback)
    }
}
