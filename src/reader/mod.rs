//! Reading session helpers: the dwell timer that marks articles as read.

pub mod scheduled;
pub mod timer;

pub use scheduled::ScheduledTask;
pub use timer::{AutoMarkReadTimer, FireOutcome, TimerPhase, TimerState, DEFAULT_MARK_READ_DELAY};
