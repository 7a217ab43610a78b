//! Tagged outcome of an asynchronous computation.

use crate::error::Error;

/// The settled value of a [`Future`](crate::Future): either a success value or an error.
///
/// A `FutureResult` is immutable once built. Every awaiter of a future receives its
/// own clone of the same result.
///
/// # Example
/// ```ignore
/// let ok: FutureResult<i32> = FutureResult::Success(7);
/// assert_eq!(ok.value(), Some(&7));
/// assert_eq!(ok.unwrap().unwrap(), 7);
/// ```
#[derive(Debug, Clone)]
pub enum FutureResult<T> {
    /// The computation produced a value.
    Success(T),
    /// The computation failed.
    Error(Error),
}

impl<T> FutureResult<T> {
    /// Returns the success value, or `None` if this result holds an error.
    pub fn value(&self) -> Option<&T> {
        match self {
            FutureResult::Success(value) => Some(value),
            FutureResult::Error(_) => None,
        }
    }

    /// Returns the error, or `None` if this result holds a value.
    pub fn error(&self) -> Option<&Error> {
        match self {
            FutureResult::Success(_) => None,
            FutureResult::Error(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FutureResult::Success(_))
    }

    /// Yields the value, or returns the error as `Err` so it can be propagated with `?`.
    pub fn unwrap(self) -> Result<T, Error> {
        match self {
            FutureResult::Success(value) => Ok(value),
            FutureResult::Error(error) => Err(error),
        }
    }

    /// Maps the success value, leaving an error untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FutureResult<U> {
        match self {
            FutureResult::Success(value) => FutureResult::Success(f(value)),
            FutureResult::Error(error) => FutureResult::Error(error),
        }
    }
}

impl<T, E> From<Result<T, E>> for FutureResult<T>
where
    E: Into<Error>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => FutureResult::Success(value),
            Err(error) => FutureResult::Error(error.into()),
        }
    }
}
