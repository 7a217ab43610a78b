//! Helpers that start a future where no earlier future exists.
//!
//! These mirror calling `map` / `flat_map` on an already completed future: they
//! turn a plain, possibly failing computation into a [`Future`] owned by a loop
//! taken from a group.

use crate::error::Error;
use crate::event_loop::EventLoopGroup;
use crate::future::{Future, FutureResult};

impl<T: Clone + Send + 'static> Future<T> {
    /// Runs `work` immediately and wraps its outcome in a future.
    ///
    /// `Ok` succeeds the future with the value, `Err` fails it with the error. The
    /// future is owned by `on.next()`.
    ///
    /// # Example
    /// ```ignore
    /// let parsed = Future::lift_sync(&group, || "42".parse::<u32>().map_err(Error::new));
    /// ```
    pub fn lift_sync<G, E, F>(on: &G, work: F) -> Future<T>
    where
        G: EventLoopGroup + ?Sized,
        E: Into<Error>,
        F: FnOnce() -> Result<T, E>,
    {
        let promise = on.next().make_promise();
        let future = promise.future();
        promise.complete(FutureResult::from(work()));
        future
    }

    /// Runs `work` immediately; the future it returns is cascaded into the result.
    ///
    /// An `Err` returned synchronously by `work` fails the result directly.
    pub fn lift_async<G, E, F>(on: &G, work: F) -> Future<T>
    where
        G: EventLoopGroup + ?Sized,
        E: Into<Error>,
        F: FnOnce() -> Result<Future<T>, E>,
    {
        let promise = on.next().make_promise();
        let future = promise.future();

        match work() {
            Ok(inner) => inner.cascade(promise),
            Err(error) => promise.fail(error),
        }

        future
    }

    /// A future already succeeded with `value`.
    pub fn succeeded<G>(on: &G, value: T) -> Future<T>
    where
        G: EventLoopGroup + ?Sized,
    {
        on.next().make_succeeded_future(value)
    }

    /// A future already failed with `error`.
    pub fn failed<G>(on: &G, error: impl Into<Error>) -> Future<T>
    where
        G: EventLoopGroup + ?Sized,
    {
        on.next().make_failed_future(error)
    }
}

impl Future<()> {
    /// A pre-completed `Future<()>`.
    pub fn done<G>(on: &G) -> Future<()>
    where
        G: EventLoopGroup + ?Sized,
    {
        on.next().make_succeeded_future(())
    }
}
