//! Time utilities: cancellable timers and the clock capability.
//!
//! - [`TimerHandle`] guards one scheduled callback so it either fires or is cancelled
//! - [`TimerDriver`] orders timers by deadline for the loops that own them
//! - [`Clock`] abstracts "now" and "call me at this deadline" for the main loop
//! - [`ManualClock`] is a clock advanced by hand, for deterministic tests

pub mod clock;
pub mod timer;

pub use clock::{Clock, ManualClock};
pub use timer::TimerHandle;
pub(crate) use timer::TimerDriver;
