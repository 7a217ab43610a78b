//! Runtime subsystem modules: loop queues, drivers and the thread-backed group.

pub(crate) mod context;
pub(crate) mod driver;
mod group;
pub(crate) mod queue;
pub(crate) mod waker;

pub use context::current_event_loop;
pub use group::{ThreadEventLoop, ThreadEventLoopGroup};
pub(crate) use queue::TaskQueue;
