//! Thread-local record of the event loop currently running.
//!
//! Loop threads (and the main context while it is being pumped) enter their loop
//! here before running tasks, so code inside a task can find the loop it runs on
//! without being handed a reference.
//!
//! # Example
//!
//! ```ignore
//! event_loop.execute(|| {
//!     let here = eventloop::current_event_loop().expect("running on a loop");
//!     here.execute(|| println!("queued behind the current task"));
//! });
//! ```

use crate::event_loop::EventLoopRef;

use std::cell::RefCell;

thread_local! {
    /// The loop whose tasks are running on this thread.
    ///
    /// Set by [`enter_context`] for the duration of a pump.
    pub(crate) static CURRENT_LOOP: RefCell<Option<EventLoopRef>> = const { RefCell::new(None) };
}

/// Makes `event_loop` the current loop while `function` runs.
///
/// The previous loop is restored on exit, so contexts nest.
pub(crate) fn enter_context<F, R>(event_loop: &EventLoopRef, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT_LOOP.with(|current| current.borrow_mut().replace(event_loop.clone()));

    let result = function();

    CURRENT_LOOP.with(|current| *current.borrow_mut() = previous);
    result
}

/// Returns the loop running the calling task, or `None` outside of any loop.
pub fn current_event_loop() -> Option<EventLoopRef> {
    CURRENT_LOOP.with(|current| current.borrow().clone())
}
