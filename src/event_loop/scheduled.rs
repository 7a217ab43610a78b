//! Handle to a task scheduled at a deadline.

use crate::error::Error;
use crate::future::{Future, Promise};
use crate::time::TimerHandle;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// A task scheduled on an event loop, returned by
/// [`EventLoopRef::schedule_task`](crate::EventLoopRef::schedule_task).
///
/// The timer gate guarantees that exactly one of "the task fires" or "the task is
/// cancelled" happens, so the promise behind [`future`](Self::future) is settled once.
pub struct Scheduled<T: Send + 'static> {
    future: Future<T>,
    promise: Arc<Mutex<Option<Promise<T>>>>,
    timer: TimerHandle,
}

impl<T: Send + 'static> Scheduled<T> {
    pub(crate) fn new(
        future: Future<T>,
        promise: Arc<Mutex<Option<Promise<T>>>>,
        timer: TimerHandle,
    ) -> Self {
        Self {
            future,
            promise,
            timer,
        }
    }

    /// Cancels the task if it has not fired yet.
    ///
    /// On success the task body never runs and the future fails with
    /// [`Error::Cancelled`]. Returns `false` if the task already fired or was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        if !self.timer.cancel() {
            return false;
        }

        trace!("scheduled task cancelled");
        let promise = self.promise.lock().take();
        if let Some(promise) = promise {
            promise.fail(Error::Cancelled);
        }
        true
    }

    /// Returns the future settled by the task's return value.
    pub fn future(&self) -> Future<T> {
        self.future.clone()
    }

    /// Returns `true` while the task is neither fired nor cancelled.
    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }
}
