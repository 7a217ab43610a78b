//! Fluent builders for event loop groups and the main context.
//!
//! Provides a builder pattern interface for creating and configuring
//! [`ThreadEventLoopGroup`] and [`MainContext`] instances.

use crate::error::Error;
use crate::main_loop::MainContext;
use crate::runtime::ThreadEventLoopGroup;
use crate::time::Clock;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

/// Quality-of-service hint for a group's threads.
///
/// The hint is stored and reported but not interpreted by this crate; it exists so
/// callers that map it onto platform priorities can carry it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Qos {
    Background,
    Utility,
    #[default]
    Default,
    UserInitiated,
    UserInteractive,
}

/// Builder for [`ThreadEventLoopGroup`] instances.
///
/// # Example
/// ```ignore
/// let group = EventLoopGroupBuilder::new()
///     .loop_count(3)
///     .qos(Qos::Background)
///     .thread_name("fetch")
///     .build()?;
/// ```
pub struct EventLoopGroupBuilder {
    loop_count: usize,
    qos: Qos,
    thread_name: String,
}

impl Default for EventLoopGroupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoopGroupBuilder {
    /// Creates a builder with one loop per available CPU.
    pub fn new() -> Self {
        Self {
            loop_count: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            qos: Qos::default(),
            thread_name: String::from("eventloop"),
        }
    }

    /// Sets the number of loops (and threads) in the group.
    ///
    /// # Arguments
    /// * `loop_count` - Number of loops; zero is rejected by `build`
    pub fn loop_count(mut self, loop_count: usize) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Sets the QoS hint passed through to the group.
    ///
    /// # Arguments
    /// * `qos` - The hint reported by [`ThreadEventLoopGroup::qos`]
    pub fn qos(mut self, qos: Qos) -> Self {
        self.qos = qos;
        self
    }

    /// Sets the prefix of the loop thread names; loops are named `{prefix}-{index}`.
    ///
    /// # Arguments
    /// * `prefix` - Thread name prefix
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Spawns the loops and returns the running group.
    ///
    /// # Returns
    /// The started group, each loop already running on its own thread
    ///
    /// # Errors
    /// [`Error::InvalidLoopCount`] for zero loops, [`Error::Spawn`] if a thread
    /// cannot be started.
    pub fn build(self) -> Result<ThreadEventLoopGroup, Error> {
        ThreadEventLoopGroup::start(self.loop_count, self.qos, &self.thread_name)
    }
}

/// Builder for [`MainContext`] instances.
///
/// The context is bound to the thread that calls [`build`](Self::build) or
/// [`init`](Self::init).
#[derive(Default)]
pub struct MainContextBuilder {
    clock: Option<Arc<dyn Clock>>,
}

impl MainContextBuilder {
    /// Creates a builder using the context's own timer facility.
    pub fn new() -> Self {
        Self { clock: None }
    }

    /// Replaces the timer facility used for deadline scheduling.
    ///
    /// # Arguments
    /// * `clock` - Clock that tells time and fires the main loop's timers
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Binds a context to the current thread without claiming the process-wide
    /// main slot.
    ///
    /// Used for embedding several independent contexts, and by tests.
    pub fn build(self) -> MainContext {
        MainContext::bind(self.clock)
    }

    /// Binds the process-wide main context to the current thread.
    ///
    /// # Errors
    /// [`Error::MainContextAlreadyBound`] if a main context was already
    /// initialised in this process.
    pub fn init(self) -> Result<MainContext, Error> {
        MainContext::claim(self.clock)
    }
}
