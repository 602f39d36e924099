//! One-shot delay timers.
//!
//! The alarm only needs a small contract from its timer: arm a single
//! delayed callback, cancel it, and ask whether it is still outstanding.
//! Each arm is identified by a [`TimerTicket`] that is handed back to the
//! expiry callback, so the owner can tell a current expiry from a stale one
//! that was already on its way when the timer was stopped.

mod runtime;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use runtime::TokioTimerService;

/// Identifies one `start` of a [`OneShotTimer`].
///
/// Implementations hand out distinct tickets for successive arms of the
/// same timer; the numbering is otherwise up to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTicket(pub u64);

impl fmt::Display for TimerTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Called on the timer's execution context when an arm expires.
pub type ExpiryCallback = Arc<dyn Fn(TimerTicket) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("no timer runtime available")]
    NoRuntime,

    #[error("failed to create timer {name}: {reason}")]
    Create { name: String, reason: String },

    #[error("failed to start timer: {0}")]
    Start(String),

    #[error("failed to stop timer: {0}")]
    Stop(String),
}

/// A single cancellable delayed callback.
///
/// The expiry callback fires at most once per [`start`](Self::start) and
/// never after a [`stop`](Self::stop) of the same ticket has returned,
/// unless it was already executing.
pub trait OneShotTimer: Send {
    /// Arm the timer. Any arm still outstanding is replaced.
    fn start(&mut self, delay: Duration) -> Result<TimerTicket, TimerError>;

    /// Cancel an arm. Stopping a stale or already-expired ticket is a no-op.
    fn stop(&mut self, ticket: TimerTicket) -> Result<(), TimerError>;

    /// Whether `ticket` is the current arm and its callback has not finished.
    fn is_pending(&self, ticket: TimerTicket) -> bool;
}

/// Creates timers bound to an expiry callback.
pub trait TimerService {
    fn create_timer(
        &self,
        name: &str,
        on_expiry: ExpiryCallback,
    ) -> Result<Box<dyn OneShotTimer>, TimerError>;
}
