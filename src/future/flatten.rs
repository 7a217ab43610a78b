//! Combinators that fold a collection of futures into one.
//!
//! - [`sync_flatten`] starts lazily produced futures one after another
//! - [`flatten`] waits for futures that are already running
//!
//! Both keep results in input order and fail with the first error they observe.
//!
//! # Example
//! ```ignore
//! use eventloop::{flatten, lazy, sync_flatten};
//!
//! // One request at a time; the second starts only after the first succeeds.
//! let steps = vec![
//!     lazy(move || Ok::<_, Error>(fetch(&group, 1))),
//!     lazy(move || Ok::<_, Error>(fetch(&group, 2))),
//! ];
//! let in_sequence = sync_flatten(steps, &group);
//!
//! // Everything at once; results still come back as [a, b, c].
//! let all = flatten(vec![a, b, c], &group);
//! ```

use crate::error::Error;
use crate::event_loop::EventLoopGroup;
use crate::future::{Future, FutureResult, Promise};

use std::sync::Arc;

use parking_lot::Mutex;

/// A closure that starts an asynchronous step when called.
///
/// Returning `Err` stands for a step that failed before producing a future.
pub type LazyFuture<T> = Box<dyn FnOnce() -> Result<Future<T>, Error> + Send + 'static>;

/// Boxes a closure as a [`LazyFuture`].
pub fn lazy<T, E, F>(step: F) -> LazyFuture<T>
where
    E: Into<Error>,
    F: FnOnce() -> Result<Future<T>, E> + Send + 'static,
{
    Box::new(move || step().map_err(Into::into))
}

/// Runs lazy futures one at a time and collects their results in order.
///
/// A step is started only after the previous one succeeded. The first step that
/// returns `Err` or whose future fails stops the chain: later steps are never
/// called and the combined future fails with that error. An empty input succeeds
/// immediately with an empty vector.
pub fn sync_flatten<T, G, I>(steps: I, on: &G) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
    G: EventLoopGroup + ?Sized,
    I: IntoIterator<Item = LazyFuture<T>>,
    I::IntoIter: Send + 'static,
{
    let promise = on.next().make_promise::<Vec<T>>();
    let future = promise.future();

    let steps = steps.into_iter();
    let results = Vec::with_capacity(steps.size_hint().0);
    run_next(steps, results, promise);

    future
}

/// [`sync_flatten`] over steps without a result, collapsed to a single `Future<()>`.
pub fn sync_flatten_void<G, I>(steps: I, on: &G) -> Future<()>
where
    G: EventLoopGroup + ?Sized,
    I: IntoIterator<Item = LazyFuture<()>>,
    I::IntoIter: Send + 'static,
{
    sync_flatten(steps, on).transform_to(())
}

// Starts the next step; its awaiter continues the chain on the step's loop.
fn run_next<T, I>(mut steps: I, mut results: Vec<T>, promise: Promise<Vec<T>>)
where
    T: Clone + Send + 'static,
    I: Iterator<Item = LazyFuture<T>> + Send + 'static,
{
    let Some(step) = steps.next() else {
        promise.succeed(results);
        return;
    };

    match step() {
        Ok(future) => future.add_awaiter(move |result| match result {
            FutureResult::Success(value) => {
                results.push(value);
                run_next(steps, results, promise);
            }
            FutureResult::Error(error) => promise.fail(error),
        }),
        Err(error) => promise.fail(error),
    }
}

/// Waits for every future and returns their results in input order.
///
/// Completion order does not matter. If any input fails, the combined future fails
/// with the first error to settle; later results are ignored. An empty input
/// succeeds immediately with an empty vector.
pub fn flatten<T, G, I>(futures: I, on: &G) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
    G: EventLoopGroup + ?Sized,
    I: IntoIterator<Item = Future<T>>,
{
    let futures: Vec<Future<T>> = futures.into_iter().collect();
    let promise = on.next().make_promise::<Vec<T>>();
    let future = promise.future();

    if futures.is_empty() {
        promise.succeed(Vec::new());
        return future;
    }

    let join = Arc::new(Mutex::new(Join::new(futures.len(), promise)));

    for (index, input) in futures.into_iter().enumerate() {
        let join = join.clone();
        input.add_awaiter(move |result| {
            let finished = join.lock().record(index, result);
            if let Some((promise, result)) = finished {
                promise.complete(result);
            }
        });
    }

    future
}

/// [`flatten`] over futures without a result, collapsed to a single `Future<()>`.
pub fn flatten_void<G, I>(futures: I, on: &G) -> Future<()>
where
    G: EventLoopGroup + ?Sized,
    I: IntoIterator<Item = Future<()>>,
{
    flatten(futures, on).transform_to(())
}

/// Bookkeeping for one parallel join.
struct Join<T: Send + 'static> {
    values: Vec<Option<T>>,
    remaining: usize,
    // Taken by whichever input finishes the join.
    promise: Option<Promise<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Join<T> {
    fn new(count: usize, promise: Promise<Vec<T>>) -> Self {
        Self {
            values: (0..count).map(|_| None).collect(),
            remaining: count,
            promise: Some(promise),
        }
    }

    /// Stores one input's result.
    ///
    /// Returns the promise and its final result once the join is decided.
    fn record(
        &mut self,
        index: usize,
        result: FutureResult<T>,
    ) -> Option<(Promise<Vec<T>>, FutureResult<Vec<T>>)> {
        self.promise.as_ref()?;

        match result {
            FutureResult::Success(value) => {
                self.values[index] = Some(value);
                self.remaining -= 1;
                if self.remaining > 0 {
                    return None;
                }

                let values = self.values.drain(..).flatten().collect();
                self.promise
                    .take()
                    .map(|promise| (promise, FutureResult::Success(values)))
            }
            FutureResult::Error(error) => self
                .promise
                .take()
                .map(|promise| (promise, FutureResult::Error(error))),
        }
    }
}
