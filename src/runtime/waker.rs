//! Waker that rouses a parked task queue.
//!
//! Lets a thread that pumps a [`TaskQueue`] poll a `std` future between passes:
//! waking the future notifies the queue, so a park in progress returns and the
//! future is polled again.

use crate::runtime::TaskQueue;

use std::sync::Arc;
use std::task::Waker;

use futures::task::{self, ArcWake};

/// Wakes the pumping thread of a queue when the polled future is ready.
pub(crate) struct QueueWaker {
    queue: Arc<TaskQueue>,
}

impl QueueWaker {
    /// Creates a waker for the given queue.
    ///
    /// # Arguments
    /// * `queue` - The queue whose parked thread is notified on wake
    ///
    /// # Returns
    /// A `std` waker backed by the queue
    pub(crate) fn waker(queue: Arc<TaskQueue>) -> Waker {
        task::waker(Arc::new(Self { queue }))
    }
}

impl ArcWake for QueueWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.queue.notify();
    }
}
