//! Thread-backed event loops and the group that owns them.
//!
//! Each [`ThreadEventLoop`] runs on its own OS thread with its own task queue and
//! timer heap. A [`ThreadEventLoopGroup`] owns a fixed number of them and hands
//! them out round-robin.

use crate::builder::{EventLoopGroupBuilder, Qos};
use crate::error::Error;
use crate::event_loop::{EventLoop, EventLoopGroup, EventLoopRef, Task};
use crate::runtime::TaskQueue;
use crate::runtime::driver::spawn_driver;
use crate::time::TimerHandle;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// An event loop running on a dedicated thread.
pub struct ThreadEventLoop {
    name: String,
    queue: Arc<TaskQueue>,
    thread: OnceLock<ThreadId>,
}

impl ThreadEventLoop {
    /// The loop's thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // Stops the loop and drops whatever never ran.
    fn stop(&self) {
        let abandoned = self.queue.shutdown();
        if !abandoned.is_empty() {
            debug!(event_loop = %self.name, dropped = abandoned.len(), "dropping unrun tasks");
        }
        drop(abandoned);
    }
}

impl EventLoop for ThreadEventLoop {
    fn in_event_loop(&self) -> bool {
        self.thread.get() == Some(&thread::current().id())
    }

    fn execute(&self, task: Task) {
        if !self.queue.push(task) {
            warn!(event_loop = %self.name, "task submitted to a stopped event loop was dropped");
        }
    }

    fn schedule_at(&self, deadline: Instant, task: Task) -> TimerHandle {
        let timer = self.queue.schedule(deadline, task);
        if timer.is_cancelled() {
            warn!(event_loop = %self.name, "timer scheduled on a stopped event loop was dropped");
        }
        timer
    }

    /// Stops this loop only; the rest of its group keeps running.
    fn shutdown_gracefully(&self) -> Result<(), Error> {
        self.stop();
        Ok(())
    }
}

impl fmt::Debug for ThreadEventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadEventLoop")
            .field("name", &self.name)
            .field("stopped", &self.queue.is_shutdown())
            .finish()
    }
}

/// A fixed-size pool of [`ThreadEventLoop`]s.
///
/// Dropping the group shuts it down.
///
/// # Example
/// ```ignore
/// let group = ThreadEventLoopGroup::builder()
///     .loop_count(3)
///     .qos(Qos::Utility)
///     .build()?;
///
/// let event_loop = group.next();
/// event_loop.execute(|| println!("on a background loop"));
/// group.shutdown_gracefully()?;
/// ```
pub struct ThreadEventLoopGroup {
    loops: Vec<(EventLoopRef, Arc<ThreadEventLoop>)>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    cursor: AtomicUsize,
    qos: Qos,
    stopped: AtomicBool,
}

impl ThreadEventLoopGroup {
    /// Creates a group of `loop_count` loops with default settings.
    ///
    /// # Errors
    /// [`Error::InvalidLoopCount`] for zero loops, [`Error::Spawn`] if a thread
    /// cannot be started.
    pub fn new(loop_count: usize) -> Result<Self, Error> {
        EventLoopGroupBuilder::new().loop_count(loop_count).build()
    }

    /// Returns a builder for configuring a group.
    pub fn builder() -> EventLoopGroupBuilder {
        EventLoopGroupBuilder::new()
    }

    pub(crate) fn start(loop_count: usize, qos: Qos, thread_name: &str) -> Result<Self, Error> {
        if loop_count == 0 {
            return Err(Error::InvalidLoopCount);
        }

        let mut group = Self {
            loops: Vec::with_capacity(loop_count),
            threads: Mutex::new(Vec::with_capacity(loop_count)),
            cursor: AtomicUsize::new(0),
            qos,
            stopped: AtomicBool::new(false),
        };

        for index in 0..loop_count {
            let event_loop = Arc::new(ThreadEventLoop {
                name: format!("{thread_name}-{index}"),
                queue: Arc::new(TaskQueue::new()),
                thread: OnceLock::new(),
            });
            let handle = EventLoopRef::from_arc(event_loop.clone());

            // Dropping `group` on error stops the loops started so far.
            let thread = spawn_driver(
                event_loop.name.clone(),
                handle.clone(),
                event_loop.queue.clone(),
            )
            .map_err(|error| Error::Spawn(Arc::new(error)))?;

            let _ = event_loop.thread.set(thread.thread().id());
            group.threads.lock().push(thread);
            group.loops.push((handle, event_loop));
        }

        debug!(loop_count, ?qos, "event loop group started");
        Ok(group)
    }

    /// Number of loops in the group.
    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    /// The QoS hint the group was built with.
    pub fn qos(&self) -> Qos {
        self.qos
    }

    /// Iterates over every loop in the group.
    pub fn iter(&self) -> impl Iterator<Item = &EventLoopRef> + '_ {
        self.loops.iter().map(|(handle, _)| handle)
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        for (_, event_loop) in &self.loops {
            event_loop.stop();
        }

        let threads: Vec<JoinHandle<()>> = self.threads.lock().drain(..).collect();
        let current = thread::current().id();
        for thread in threads {
            // A loop shutting down its own group cannot join itself.
            if thread.thread().id() == current {
                continue;
            }
            if thread.join().is_err() {
                warn!("event loop thread panicked");
            }
        }

        debug!("event loop group stopped");
    }
}

impl EventLoopGroup for ThreadEventLoopGroup {
    /// Round-robin over the group's loops.
    fn next(&self) -> EventLoopRef {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.loops.len();
        self.loops[index].0.clone()
    }

    /// Stops every loop and joins their threads. Calling it again does nothing.
    fn shutdown_gracefully(&self) -> Result<(), Error> {
        self.stop();
        Ok(())
    }
}

impl Drop for ThreadEventLoopGroup {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ThreadEventLoopGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadEventLoopGroup")
            .field("loops", &self.loops.len())
            .field("qos", &self.qos)
            .field("stopped", &self.stopped.load(Ordering::SeqCst))
            .finish()
    }
}
