//! Event loop and event loop group contracts.
//!
//! An [`EventLoop`] is a single-threaded cooperative execution context: tasks
//! submitted to it never run concurrently with each other, and every promise
//! created on it dispatches its awaiters there.
//!
//! The trait is kept object safe so loops can be shared as `Arc<dyn EventLoop>`.
//! [`EventLoopRef`] wraps such a pointer and adds the typed surface: promise
//! creation and deadline scheduling with a result.
//!
//! # Example
//! ```ignore
//! use eventloop::{EventLoopGroup, ThreadEventLoopGroup};
//! use std::time::Duration;
//!
//! let group = ThreadEventLoopGroup::new(2)?;
//! let event_loop = group.next();
//!
//! let scheduled = event_loop.schedule_task_in(Duration::from_millis(10), || {
//!     Ok::<_, eventloop::Error>(42)
//! });
//! assert_eq!(scheduled.future().wait()?, 42);
//! ```

mod scheduled;

pub use scheduled::Scheduled;

use crate::builder::Qos;
use crate::error::Error;
use crate::future::{Future, FutureResult, Promise};
use crate::time::TimerHandle;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A unit of work submitted to an event loop.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A logical, single-threaded execution context that owns task dispatch and timers.
///
/// Implementations must never block the caller in [`execute`](EventLoop::execute)
/// or [`schedule_at`](EventLoop::schedule_at), and never run the task inline:
/// promises submit their awaiters while holding their own lock.
pub trait EventLoop: Send + Sync + 'static {
    /// Returns `true` if the calling thread is this loop's thread.
    fn in_event_loop(&self) -> bool;

    /// The loop's notion of the current time, used to turn delays into deadlines.
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// Enqueues `task` to run on the loop. Tasks run in submission order.
    fn execute(&self, task: Task);

    /// Like [`execute`](EventLoop::execute), with a quality-of-service hint.
    ///
    /// Loops that have no use for the hint run the task as a plain `execute`.
    fn execute_with_qos(&self, _qos: Qos, task: Task) {
        self.execute(task);
    }

    /// Runs `task` on the loop no earlier than `deadline`.
    ///
    /// The returned handle cancels the timer. A cancelled task never runs.
    fn schedule_at(&self, deadline: Instant, task: Task) -> TimerHandle;

    /// Like [`schedule_at`](EventLoop::schedule_at), with a quality-of-service hint.
    fn schedule_at_with_qos(&self, deadline: Instant, _qos: Qos, task: Task) -> TimerHandle {
        self.schedule_at(deadline, task)
    }

    /// Stops the loop.
    ///
    /// Loops that are bound to a fixed context refuse with an error.
    fn shutdown_gracefully(&self) -> Result<(), Error>;
}

/// A pool that vends event loops.
pub trait EventLoopGroup: Send + Sync {
    /// Returns one loop from the pool.
    fn next(&self) -> EventLoopRef;

    /// Releases every loop in the pool.
    fn shutdown_gracefully(&self) -> Result<(), Error>;
}

/// Cloneable handle to a shared [`EventLoop`].
///
/// Promises and futures keep one of these to know where their awaiters run.
#[derive(Clone)]
pub struct EventLoopRef {
    inner: Arc<dyn EventLoop>,
}

impl EventLoopRef {
    /// Wraps a loop implementation in a shareable handle.
    pub fn new<L: EventLoop>(event_loop: L) -> Self {
        Self {
            inner: Arc::new(event_loop),
        }
    }

    /// Wraps an already shared loop.
    pub fn from_arc(inner: Arc<dyn EventLoop>) -> Self {
        Self { inner }
    }

    /// See [`EventLoop::in_event_loop`].
    pub fn in_event_loop(&self) -> bool {
        self.inner.in_event_loop()
    }

    /// Enqueues a closure on the loop.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.execute(Box::new(task));
    }

    /// Enqueues a closure with a quality-of-service hint.
    pub fn execute_with_qos<F>(&self, qos: Qos, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.execute_with_qos(qos, Box::new(task));
    }

    /// Returns `true` if both handles point at the same loop.
    pub fn same_loop(&self, other: &EventLoopRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }

    /// Creates a new unsettled promise whose awaiters run on this loop.
    pub fn make_promise<T: Send + 'static>(&self) -> Promise<T> {
        Promise::new(self.clone())
    }

    /// Returns a future already succeeded with `value`.
    pub fn make_succeeded_future<T: Clone + Send + 'static>(&self, value: T) -> Future<T> {
        let promise = self.make_promise();
        let future = promise.future();
        promise.succeed(value);
        future
    }

    /// Returns a future already failed with `error`.
    pub fn make_failed_future<T: Send + 'static>(&self, error: impl Into<Error>) -> Future<T> {
        let promise = self.make_promise();
        let future = promise.future();
        promise.fail(error);
        future
    }

    /// Runs `work` on this loop no earlier than `deadline`.
    ///
    /// The work's return value settles the scheduled future. Cancelling before the
    /// deadline fails it with [`Error::Cancelled`] and `work` never runs.
    ///
    /// # Example
    /// ```ignore
    /// let scheduled = event_loop.schedule_task(Instant::now() + Duration::from_secs(1), || {
    ///     Ok::<_, Error>("fired")
    /// });
    /// scheduled.cancel();
    /// ```
    pub fn schedule_task<T, E, F>(&self, deadline: Instant, work: F) -> Scheduled<T>
    where
        T: Clone + Send + 'static,
        E: Into<Error>,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.schedule_task_with_qos(deadline, Qos::Default, work)
    }

    /// [`schedule_task`](Self::schedule_task) with a quality-of-service hint for the
    /// loop.
    ///
    /// # Arguments
    /// * `deadline` - The earliest instant `work` may run
    /// * `qos` - Hint passed to [`EventLoop::schedule_at_with_qos`]
    /// * `work` - The computation whose result settles the future
    ///
    /// # Returns
    /// A handle to cancel the task and observe its result.
    pub fn schedule_task_with_qos<T, E, F>(
        &self,
        deadline: Instant,
        qos: Qos,
        work: F,
    ) -> Scheduled<T>
    where
        T: Clone + Send + 'static,
        E: Into<Error>,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let promise = self.make_promise::<T>();
        let future = promise.future();
        let slot = Arc::new(Mutex::new(Some(promise)));

        let fired = slot.clone();
        let timer = self.inner.schedule_at_with_qos(
            deadline,
            qos,
            Box::new(move || {
                let promise = fired.lock().take();
                if let Some(promise) = promise {
                    promise.complete(FutureResult::from(work()));
                }
            }),
        );

        Scheduled::new(future, slot, timer)
    }

    /// Runs `work` on this loop after `delay`.
    ///
    /// Shorthand for [`schedule_task`](Self::schedule_task) at the loop's current time plus `delay`.
    pub fn schedule_task_in<T, E, F>(&self, delay: Duration, work: F) -> Scheduled<T>
    where
        T: Clone + Send + 'static,
        E: Into<Error>,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.schedule_task(self.inner.now() + delay, work)
    }

    /// [`schedule_task_in`](Self::schedule_task_in) with a quality-of-service hint.
    pub fn schedule_task_in_with_qos<T, E, F>(
        &self,
        delay: Duration,
        qos: Qos,
        work: F,
    ) -> Scheduled<T>
    where
        T: Clone + Send + 'static,
        E: Into<Error>,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.schedule_task_with_qos(self.inner.now() + delay, qos, work)
    }

    /// See [`EventLoop::now`].
    pub fn now(&self) -> Instant {
        self.inner.now()
    }

    /// See [`EventLoop::shutdown_gracefully`].
    pub fn shutdown_gracefully(&self) -> Result<(), Error> {
        self.inner.shutdown_gracefully()
    }
}

impl EventLoopGroup for EventLoopRef {
    /// A single loop is a group of one.
    fn next(&self) -> EventLoopRef {
        self.clone()
    }

    fn shutdown_gracefully(&self) -> Result<(), Error> {
        self.inner.shutdown_gracefully()
    }
}

impl fmt::Debug for EventLoopRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoopRef")
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}
