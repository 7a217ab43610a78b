//! Error type shared by promises, futures and event loops.
//!
//! Every failure that can reach a [`Future`](crate::Future) is an [`Error`]. User
//! errors are carried verbatim inside [`Error::Computation`]; the remaining variants
//! are produced by the crate itself (cancellation, dropped promises, misuse).
//!
//! The type is `Clone` because a settled result is handed to every awaiter of a future.
//!
//! # Example
//! ```ignore
//! use eventloop::Error;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("not found")]
//! struct NotFound;
//!
//! let err = Error::new(NotFound);
//! assert!(err.downcast_ref::<NotFound>().is_some());
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Errors reported through futures, schedulers and event loop groups.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// An error produced by user work: a lifted closure, a transformation
    /// callback, or a failed sub-future.
    #[error(transparent)]
    Computation(Arc<dyn StdError + Send + Sync + 'static>),

    /// A scheduled task was cancelled before its deadline fired.
    #[error("scheduled task was cancelled before it ran")]
    Cancelled,

    /// The promise backing a future was dropped without being settled.
    #[error("promise dropped before it was settled")]
    PromiseDropped,

    /// The main event loop was asked to shut down.
    #[error("attempt to shut down the main event loop")]
    MainLoopShutdown,

    /// A second thread tried to bind itself as the process main context.
    #[error("the main context is already bound to another thread")]
    MainContextAlreadyBound,

    /// The loop owning a future stopped before delivering its result.
    #[error("event loop shut down before the result was delivered")]
    LoopShutdown,

    /// A blocking wait was attempted on the loop that must deliver the result.
    #[error("cannot block waiting on a future from inside its own event loop")]
    WaitInEventLoop,

    /// An event loop group was configured with zero loops.
    #[error("an event loop group needs at least one loop")]
    InvalidLoopCount,

    /// The operating system refused to spawn a loop thread.
    #[error("failed to spawn event loop thread")]
    Spawn(#[source] Arc<io::Error>),
}

impl Error {
    /// Wraps an arbitrary error as a computation error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error::Computation(Arc::new(error))
    }

    /// Builds a computation error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Computation(Arc::new(Message(message.into())))
    }

    /// Returns the wrapped computation error as `E`, if that is what it holds.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Error::Computation(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns `true` for [`Error::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::new(error)
    }
}

impl From<Box<dyn StdError + Send + Sync + 'static>> for Error {
    fn from(error: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Error::Computation(Arc::from(error))
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::msg(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::msg(message)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

// Message-only error used by `Error::msg`.
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}
