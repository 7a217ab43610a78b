//! Promise/future pairs bound to pluggable event loops.
//!
//! This crate provides a minimal asynchronous value abstraction and the event loops
//! that deliver it. A [`Promise`] is settled exactly once, from any thread; the
//! awaiters of its [`Future`] always run on the loop that created the promise.
//!
//! # Architecture
//!
//! - **FutureResult**: tagged success/error outcome of an asynchronous computation
//! - **Promise / Future**: single-assignment write side and cloneable read side
//! - **EventLoop**: object-safe contract for task submission and deadline scheduling
//! - **EventLoopGroup**: a pool that vends loops (`next`) and shuts them down
//! - **ThreadEventLoopGroup**: loops backed by dedicated threads, round-robin
//! - **MainContext / MainEventLoop**: a loop pinned to one designated thread that
//!   can never be shut down, with timers driven through a [`Clock`]
//! - **Combinators**: [`sync_flatten`] (one after another) and [`flatten`]
//!   (all at once), both keeping input order
//!
//! # Example
//! ```ignore
//! use eventloop::{EventLoopGroup, Future, ThreadEventLoopGroup, flatten};
//! use std::time::Duration;
//!
//! let group = ThreadEventLoopGroup::new(3)?;
//!
//! let fetch = |value: u32, delay: u64| {
//!     group
//!         .next()
//!         .schedule_task_in(Duration::from_millis(delay), move || Ok::<_, eventloop::Error>(value))
//!         .future()
//! };
//!
//! let sum = flatten(vec![fetch(2, 100), fetch(3, 200), fetch(5, 50)], &group)
//!     .map(|values| values.iter().sum::<u32>());
//! assert_eq!(sum.wait()?, 10);
//! ```

mod builder;
mod error;
mod event_loop;
mod future;
mod main_loop;
mod runtime;
mod time;

pub use builder::{EventLoopGroupBuilder, MainContextBuilder, Qos};
pub use error::Error;
pub use event_loop::{EventLoop, EventLoopGroup, EventLoopRef, Scheduled, Task};
pub use future::{
    Future, FutureResult, LazyFuture, Promise, Settled, flatten, flatten_void, lazy, sync_flatten,
    sync_flatten_void,
};
pub use main_loop::{MainContext, MainEventLoop};
pub use runtime::{ThreadEventLoop, ThreadEventLoopGroup, current_event_loop};
pub use time::{Clock, ManualClock, TimerHandle};
