//! Pumps a loop's queue: fires due timers, runs ready tasks, parks when idle.
//!
//! Worker loops run [`drive`] on a dedicated thread until their queue shuts down.
//! The main context calls [`run_ready`] itself from the thread it is bound to.

use crate::event_loop::EventLoopRef;
use crate::runtime::TaskQueue;
use crate::runtime::context::enter_context;

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, trace};

/// Runs every timer due now, then the tasks that were queued when the pass began.
///
/// Tasks enqueued by those tasks wait for the next pass, so a task that keeps
/// re-submitting itself cannot starve timers.
///
/// # Arguments
/// * `queue` - The queue to drain
///
/// # Returns
/// The number of tasks run.
pub(crate) fn run_ready(queue: &TaskQueue) -> usize {
    let mut ran = 0;

    for task in queue.take_expired(Instant::now()) {
        task();
        ran += 1;
    }

    for _ in 0..queue.len() {
        let Some(task) = queue.pop() else {
            break;
        };
        task();
        ran += 1;
    }

    if ran > 0 {
        trace!(ran, "event loop pass");
    }
    ran
}

/// Runs the loop on the current thread until its queue shuts down.
///
/// The loop is entered as the thread's current loop for the whole run.
///
/// # Arguments
/// * `event_loop` - Handle registered as the current loop
/// * `queue` - The queue to pump
pub(crate) fn drive(event_loop: &EventLoopRef, queue: &TaskQueue) {
    enter_context(event_loop, || {
        loop {
            if queue.is_shutdown() {
                break;
            }

            run_ready(queue);

            // Tasks queued during the pass run before parking
            if !queue.is_empty() {
                continue;
            }

            queue.park(None);
        }
    });
}

/// Starts a dedicated thread driving `queue` for `event_loop`.
///
/// # Arguments
/// * `name` - Thread name, also used in log records
/// * `event_loop` - Handle registered as the thread's current loop
/// * `queue` - The queue the thread pumps
///
/// # Returns
/// The join handle of the spawned thread, or the spawn error
pub(crate) fn spawn_driver(
    name: String,
    event_loop: EventLoopRef,
    queue: Arc<TaskQueue>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name.clone()).spawn(move || {
        debug!(event_loop = %name, "event loop started");
        drive(&event_loop, &queue);
        debug!(event_loop = %name, "event loop stopped");
    })
}
