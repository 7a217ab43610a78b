//! The main event loop: an event loop pinned to one designated thread.
//!
//! A [`MainContext`] is created on the thread that owns the application's primary
//! context (typically the UI thread) and stays bound to it for its whole life. It
//! vends a [`MainEventLoop`] handle that any thread may use to submit work, and it
//! is pumped from the bound thread with [`MainContext::run_until`] and friends.
//!
//! Deadline scheduling goes through a [`Clock`]. By default the context uses its
//! own timer heap; tests can inject a [`ManualClock`](crate::ManualClock) and move
//! time by hand.
//!
//! The main loop can never be shut down: [`EventLoop::shutdown_gracefully`] returns
//! [`Error::MainLoopShutdown`].
//!
//! # Example
//!
//! ```ignore
//! use eventloop::{MainContext, ThreadEventLoopGroup, EventLoopGroup};
//! use std::time::Duration;
//!
//! let main = MainContext::init()?;
//! let background = ThreadEventLoopGroup::new(3)?;
//!
//! // Fetch on a background loop, deliver on the main thread.
//! let promise = main.event_loop().make_promise::<u32>();
//! let result = promise.future();
//! background.next().schedule_task_in(Duration::from_millis(50), move || {
//!     promise.succeed(7);
//!     Ok::<_, eventloop::Error>(())
//! });
//!
//! assert_eq!(main.run_until(&result)?, 7);
//! ```

use crate::builder::{MainContextBuilder, Qos};
use crate::error::Error;
use crate::event_loop::{EventLoop, EventLoopRef, Task};
use crate::future::Future;
use crate::runtime::TaskQueue;
use crate::runtime::context::enter_context;
use crate::runtime::driver::run_ready;
use crate::runtime::waker::QueueWaker;
use crate::time::{Clock, TimerHandle};

use std::fmt;
use std::future::IntoFuture;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, trace};

// Claimed by the first `MainContext::init` in the process.
static MAIN_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Event loop that runs every task on its [`MainContext`]'s thread.
pub struct MainEventLoop {
    queue: Arc<TaskQueue>,
    clock: Arc<dyn Clock>,
    thread: ThreadId,
    // Timers handed out by `schedule_at`; pruned as they fire or are cancelled.
    timers: Mutex<Vec<TimerHandle>>,
}

impl MainEventLoop {
    /// Returns `true` while at least one scheduled task awaits its deadline.
    ///
    /// The loop is idle otherwise.
    pub fn has_pending_timers(&self) -> bool {
        let mut timers = self.timers.lock();
        timers.retain(TimerHandle::is_armed);
        !timers.is_empty()
    }
}

impl EventLoop for MainEventLoop {
    fn in_event_loop(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn execute(&self, task: Task) {
        // The queue of the main context is never shut down.
        self.queue.push(task);
    }

    fn execute_with_qos(&self, qos: Qos, task: Task) {
        trace!(?qos, "main loop task submitted");
        self.execute(task);
    }

    fn schedule_at(&self, deadline: Instant, task: Task) -> TimerHandle {
        let queue = self.queue.clone();
        let timer = self.clock.schedule_once(
            deadline,
            Box::new(move || {
                queue.push(task);
            }),
        );

        let mut timers = self.timers.lock();
        timers.retain(TimerHandle::is_armed);
        timers.push(timer.clone());
        trace!(pending = timers.len(), "main loop timer scheduled");

        timer
    }

    fn schedule_at_with_qos(&self, deadline: Instant, qos: Qos, task: Task) -> TimerHandle {
        trace!(?qos, "main loop timer requested");
        self.schedule_at(deadline, task)
    }

    fn shutdown_gracefully(&self) -> Result<(), Error> {
        error!("attempt to shut down the main event loop");
        Err(Error::MainLoopShutdown)
    }
}

impl fmt::Debug for MainEventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainEventLoop")
            .field("thread", &self.thread)
            .finish()
    }
}

/// Timer facility backed by the context's own queue: timers fire while the
/// context is being pumped.
struct QueueClock {
    queue: Arc<TaskQueue>,
}

impl Clock for QueueClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_once(&self, deadline: Instant, callback: Task) -> TimerHandle {
        self.queue.schedule(deadline, callback)
    }
}

/// The fixed execution context the main loop is bound to.
///
/// Not `Send`: it stays on the thread that created it, and only that thread pumps
/// the loop. Hand out [`event_loop`](Self::event_loop) to other threads instead.
pub struct MainContext {
    main: Arc<MainEventLoop>,
    handle: EventLoopRef,
    queue: Arc<TaskQueue>,
    _bound: PhantomData<*const ()>,
}

impl MainContext {
    /// Binds the process-wide main context to the calling thread.
    ///
    /// Call once at process start, from the thread that will pump it.
    ///
    /// # Errors
    /// [`Error::MainContextAlreadyBound`] on any later call.
    pub fn init() -> Result<Self, Error> {
        MainContextBuilder::new().init()
    }

    /// Returns a builder for configuring a context.
    pub fn builder() -> MainContextBuilder {
        MainContextBuilder::new()
    }

    pub(crate) fn claim(clock: Option<Arc<dyn Clock>>) -> Result<Self, Error> {
        if MAIN_CLAIMED.swap(true, Ordering::SeqCst) {
            return Err(Error::MainContextAlreadyBound);
        }
        Ok(Self::bind(clock))
    }

    pub(crate) fn bind(clock: Option<Arc<dyn Clock>>) -> Self {
        let queue = Arc::new(TaskQueue::new());
        let clock = clock.unwrap_or_else(|| {
            Arc::new(QueueClock {
                queue: queue.clone(),
            })
        });

        let main = Arc::new(MainEventLoop {
            queue: queue.clone(),
            clock,
            thread: thread::current().id(),
            timers: Mutex::new(Vec::new()),
        });
        let handle = EventLoopRef::from_arc(main.clone());

        debug!(thread = ?main.thread, "main context bound");

        Self {
            main,
            handle,
            queue,
            _bound: PhantomData,
        }
    }

    /// Handle to the main loop, usable from any thread.
    pub fn event_loop(&self) -> EventLoopRef {
        self.handle.clone()
    }

    /// See [`MainEventLoop::has_pending_timers`].
    pub fn has_pending_timers(&self) -> bool {
        self.main.has_pending_timers()
    }

    /// Runs due timers and queued tasks until nothing is ready.
    ///
    /// Timers that are not yet due are left alone.
    ///
    /// # Returns
    /// The number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.turn();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }

    /// Pumps the loop for `duration`, running tasks and timers as they become ready.
    pub fn run_for(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            self.turn();

            let now = Instant::now();
            if now >= deadline {
                return;
            }
            self.queue.park(Some(deadline - now));
        }
    }

    /// Pumps the loop until `future` settles and returns its result.
    ///
    /// The future may be owned by any loop. Blocks for as long as the future stays
    /// pending.
    ///
    /// # Errors
    /// The future's error, or [`Error::LoopShutdown`] if its owning loop stopped
    /// before the result could be delivered.
    pub fn run_until<T>(&self, future: &Future<T>) -> Result<T, Error>
    where
        T: Clone + Send + 'static,
    {
        let mut settled = future.clone().into_future();
        let waker = QueueWaker::waker(self.queue.clone());
        let mut cx = Context::from_waker(&waker);

        loop {
            self.turn();

            if let Poll::Ready(result) = settled.poll_unpin(&mut cx) {
                return result;
            }
            self.queue.park(None);
        }
    }

    // One pass over the queue with the main loop entered as current.
    fn turn(&self) -> usize {
        enter_context(&self.handle, || run_ready(&self.queue))
    }
}

impl fmt::Debug for MainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainContext")
            .field("event_loop", &self.main)
            .finish()
    }
}
