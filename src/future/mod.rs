//! Promise / future pair for a single asynchronous value.
//!
//! A [`Promise`] is the write side of one settlement slot and a [`Future`] is a
//! cloneable read side over the same slot. Both are bound to the
//! [`EventLoopRef`] that created the promise: whoever settles the promise, and
//! from whichever thread, the awaiters of its future always run on that loop.
//!
//! # How settlement works
//!
//! 1. `EventLoopRef::make_promise` creates an unsettled slot
//! 2. Callers register awaiters on the [`Future`]; they are queued in order
//! 3. `succeed` / `fail` consume the promise and store the result under the slot's lock
//! 4. The queued awaiters are handed to the owning loop as a single task, so they
//!    run in registration order without interleaving with other loop work
//! 5. Awaiters added after settlement are submitted to the loop individually
//!
//! Settling takes the promise by value, so one promise can never be settled twice.
//! Dropping a promise without settling it fails the future with
//! [`Error::PromiseDropped`].
//!
//! # Example
//! ```ignore
//! let promise = event_loop.make_promise::<u32>();
//! let doubled = promise.future().map(|value| value * 2);
//!
//! std::thread::spawn(move || promise.succeed(21));
//! assert_eq!(doubled.wait()?, 42);
//! ```

mod flatten;
mod lift;
mod result;
mod wait;

pub use flatten::{LazyFuture, flatten, flatten_void, lazy, sync_flatten, sync_flatten_void};
pub use result::FutureResult;
pub use wait::Settled;

use crate::error::Error;
use crate::event_loop::EventLoopRef;

use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

/// Callback invoked with the settled result of a future.
type Awaiter<T> = Box<dyn FnOnce(FutureResult<T>) + Send + 'static>;

enum State<T> {
    Pending(Vec<Awaiter<T>>),
    Settled(FutureResult<T>),
}

/// The slot shared by a promise and all of its futures.
struct Shared<T> {
    event_loop: EventLoopRef,
    state: Mutex<State<T>>,
}

impl<T: Send + 'static> Shared<T> {
    /// Stores `result` and dispatches the pending awaiters onto the owning loop.
    ///
    /// The batch is submitted before the slot lock is released, so an awaiter
    /// registered right after settlement is queued behind it.
    ///
    /// # Arguments
    /// * `result` - The outcome to store
    /// * `duplicate` - Produces the copy handed to each awaiter
    fn settle(&self, result: FutureResult<T>, duplicate: fn(&FutureResult<T>) -> FutureResult<T>) {
        let mut state = self.state.lock();
        let awaiters = match &mut *state {
            State::Pending(awaiters) => mem::take(awaiters),
            State::Settled(_) => panic!("promise settled twice"),
        };

        let deliveries: Vec<(Awaiter<T>, FutureResult<T>)> = awaiters
            .into_iter()
            .map(|awaiter| (awaiter, duplicate(&result)))
            .collect();
        *state = State::Settled(result);

        if deliveries.is_empty() {
            return;
        }

        self.event_loop.execute(move || {
            for (awaiter, result) in deliveries {
                awaiter(result);
            }
        });
    }
}

// Used when `T` is not known to be `Clone`: only errors are ever settled that way.
fn duplicate_error<T>(result: &FutureResult<T>) -> FutureResult<T> {
    match result {
        FutureResult::Error(error) => FutureResult::Error(error.clone()),
        FutureResult::Success(_) => unreachable!("success settled without a clone bound"),
    }
}

/// Single-assignment write handle paired with a [`Future`].
///
/// Created with [`EventLoopRef::make_promise`]. Settling consumes the promise.
pub struct Promise<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    settled: bool,
}

impl<T: Send + 'static> Promise<T> {
    pub(crate) fn new(event_loop: EventLoopRef) -> Self {
        Self {
            shared: Arc::new(Shared {
                event_loop,
                state: Mutex::new(State::Pending(Vec::new())),
            }),
            settled: false,
        }
    }

    /// Returns a read handle over this promise's slot.
    pub fn future(&self) -> Future<T> {
        Future {
            shared: self.shared.clone(),
        }
    }

    /// The loop that runs this promise's awaiters.
    pub fn event_loop(&self) -> &EventLoopRef {
        &self.shared.event_loop
    }

    /// Settles the promise with an error.
    ///
    /// Safe to call from any thread; awaiters run on the owning loop.
    pub fn fail(mut self, error: impl Into<Error>) {
        self.settled = true;
        self.shared
            .settle(FutureResult::Error(error.into()), duplicate_error);
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Settles the promise with a value.
    ///
    /// Safe to call from any thread; awaiters run on the owning loop.
    pub fn succeed(self, value: T) {
        self.complete(FutureResult::Success(value));
    }

    /// Settles the promise with a prepared result.
    pub fn complete(mut self, result: FutureResult<T>) {
        self.settled = true;
        self.shared.settle(result, FutureResult::clone);
    }
}

impl Promise<()> {
    /// Succeeds a promise that carries no value.
    pub fn succeed_void(self) {
        self.succeed(());
    }
}

impl<T: Send + 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("promise dropped before it was settled");
            self.shared
                .settle(FutureResult::Error(Error::PromiseDropped), duplicate_error);
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("event_loop", &self.shared.event_loop)
            .finish()
    }
}

/// Read handle over an eventually available success-or-error outcome.
///
/// Cheap to clone; every clone observes the same result.
pub struct Future<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + 'static> Future<T> {
    /// The loop this future's awaiters run on.
    pub fn event_loop(&self) -> &EventLoopRef {
        &self.shared.event_loop
    }

    /// Returns `true` once the paired promise has been settled.
    pub fn is_settled(&self) -> bool {
        matches!(*self.shared.state.lock(), State::Settled(_))
    }
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Registers a callback invoked exactly once with the settled result.
    ///
    /// The callback always runs on the owning loop, never synchronously in the caller,
    /// even when the future is already settled.
    pub fn add_awaiter<F>(&self, callback: F)
    where
        F: FnOnce(FutureResult<T>) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        match &mut *state {
            State::Pending(awaiters) => awaiters.push(Box::new(callback)),
            // Submitted under the lock to stay behind the settlement batch.
            State::Settled(result) => {
                let settled = result.clone();
                self.shared.event_loop.execute(move || callback(settled));
            }
        }
    }

    /// Registers a callback for the success value only.
    pub fn when_success<F>(&self, callback: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.add_awaiter(move |result| {
            if let FutureResult::Success(value) = result {
                callback(value);
            }
        });
    }

    /// Registers a callback for the error only.
    pub fn when_failure<F>(&self, callback: F)
    where
        F: FnOnce(Error) + Send + 'static,
    {
        self.add_awaiter(move |result| {
            if let FutureResult::Error(error) = result {
                callback(error);
            }
        });
    }

    /// Forwards this future's result into `promise` once settled.
    pub fn cascade(&self, promise: Promise<T>) {
        self.add_awaiter(move |result| promise.complete(result));
    }

    /// Derives a future by transforming the success value.
    ///
    /// # Example
    /// ```ignore
    /// let length = name.map(|name: String| name.len());
    /// ```
    pub fn map<U, F>(&self, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.try_map(move |value| Ok::<_, Error>(f(value)))
    }

    /// Like [`map`](Self::map), but the closure may fail; its error fails the derived future.
    pub fn try_map<U, E, F>(&self, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        E: Into<Error>,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        self.derive(move |result, promise| match result {
            FutureResult::Success(value) => promise.complete(FutureResult::from(f(value))),
            FutureResult::Error(error) => promise.fail(error),
        })
    }

    /// Chains another asynchronous step that starts once this one succeeds.
    pub fn flat_map<U, F>(&self, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U> + Send + 'static,
    {
        self.derive(move |result, promise| match result {
            FutureResult::Success(value) => f(value).cascade(promise),
            FutureResult::Error(error) => promise.fail(error),
        })
    }

    /// Derives a future from the whole result, success or error.
    pub fn transform<U, E, F>(&self, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        E: Into<Error>,
        F: FnOnce(FutureResult<T>) -> Result<U, E> + Send + 'static,
    {
        self.derive(move |result, promise| promise.complete(FutureResult::from(f(result))))
    }

    /// Replaces the success value with `value`; errors pass through.
    pub fn transform_to<U>(&self, value: U) -> Future<U>
    where
        U: Clone + Send + 'static,
    {
        self.map(move |_| value)
    }

    /// Rewrites the error; successes pass through.
    pub fn map_error<F>(&self, f: F) -> Future<T>
    where
        F: FnOnce(Error) -> Error + Send + 'static,
    {
        self.derive(move |result, promise| match result {
            FutureResult::Success(value) => promise.succeed(value),
            FutureResult::Error(error) => promise.fail(f(error)),
        })
    }

    /// Turns an error back into a value, or into another error.
    pub fn recover<E, F>(&self, f: F) -> Future<T>
    where
        E: Into<Error>,
        F: FnOnce(Error) -> Result<T, E> + Send + 'static,
    {
        self.derive(move |result, promise| match result {
            FutureResult::Success(value) => promise.succeed(value),
            FutureResult::Error(error) => promise.complete(FutureResult::from(f(error))),
        })
    }

    /// Runs `f` when this future settles and passes the result through unchanged.
    pub fn always<F>(&self, f: F) -> Future<T>
    where
        F: FnOnce(&FutureResult<T>) + Send + 'static,
    {
        self.derive(move |result, promise| {
            f(&result);
            promise.complete(result);
        })
    }

    /// Re-delivers this future's result on `target`.
    ///
    /// Returns a clone when `target` already owns this future.
    pub fn hop_to(&self, target: &EventLoopRef) -> Future<T> {
        if self.event_loop().same_loop(target) {
            return self.clone();
        }

        let promise = target.make_promise();
        let future = promise.future();
        self.cascade(promise);
        future
    }

    // Builds a derived future on the same loop, completed by `step` from an awaiter.
    fn derive<U, F>(&self, step: F) -> Future<U>
    where
        U: Send + 'static,
        F: FnOnce(FutureResult<T>, Promise<U>) + Send + 'static,
    {
        let promise = self.event_loop().make_promise::<U>();
        let future = promise.future();
        self.add_awaiter(move |result| step(result, promise));
        future
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("event_loop", &self.shared.event_loop)
            .finish()
    }
}
