//! Bridges from loop-owned futures to `async` code and blocking callers.
//!
//! A [`Future`] can be `.await`ed from any executor through [`IntoFuture`]: an
//! awaiter forwards the settled result over a oneshot channel. [`Future::wait`]
//! blocks the current thread on that channel.

use crate::error::Error;
use crate::future::{Future, FutureResult};

use std::future::IntoFuture;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::block_on;

/// `std` future resolving to the result of a [`Future`].
///
/// Created by `.await` / `into_future()` on a [`Future`].
pub struct Settled<T> {
    receiver: oneshot::Receiver<FutureResult<T>>,
}

impl<T> std::future::Future for Settled<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.receiver.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result.unwrap()),
            // The awaiter was dropped without running: its loop stopped.
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(Error::LoopShutdown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T: Clone + Send + 'static> IntoFuture for Future<T> {
    type Output = Result<T, Error>;
    type IntoFuture = Settled<T>;

    fn into_future(self) -> Self::IntoFuture {
        let (sender, receiver) = oneshot::channel();
        self.add_awaiter(move |result| {
            // The receiver may be gone if the caller stopped waiting.
            let _ = sender.send(result);
        });

        Settled { receiver }
    }
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Blocks the current thread until the future settles.
    ///
    /// # Errors
    /// Returns [`Error::WaitInEventLoop`] when called on the future's own loop,
    /// which could never deliver the result while blocked. Otherwise returns the
    /// future's error.
    pub fn wait(&self) -> Result<T, Error> {
        if self.event_loop().in_event_loop() {
            return Err(Error::WaitInEventLoop);
        }

        block_on(self.clone().into_future())
    }
}
