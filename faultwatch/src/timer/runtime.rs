use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ExpiryCallback, OneShotTimer, TimerError, TimerService, TimerTicket};
use crate::tracing::prelude::*;

/// Timer service backed by a tokio runtime.
///
/// Every arm is a spawned task that sleeps for the delay and then runs the
/// expiry callback on a runtime worker. Cancellation goes through a
/// [`CancellationToken`] and never waits for the task, so it is safe to stop
/// a timer while holding a lock the callback is about to take.
#[derive(Debug, Clone)]
pub struct TokioTimerService {
    runtime: Handle,
}

impl TokioTimerService {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Bind to the runtime of the calling context.
    pub fn current() -> Result<Self, TimerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| TimerError::NoRuntime)
    }
}

impl TimerService for TokioTimerService {
    fn create_timer(
        &self,
        name: &str,
        on_expiry: ExpiryCallback,
    ) -> Result<Box<dyn OneShotTimer>, TimerError> {
        Ok(Box::new(TokioOneShot {
            name: name.to_string(),
            runtime: self.runtime.clone(),
            on_expiry,
            next_ticket: 0,
            armed: None,
        }))
    }
}

struct Armed {
    ticket: TimerTicket,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct TokioOneShot {
    name: String,
    runtime: Handle,
    on_expiry: ExpiryCallback,
    next_ticket: u64,
    armed: Option<Armed>,
}

impl OneShotTimer for TokioOneShot {
    fn start(&mut self, delay: Duration) -> Result<TimerTicket, TimerError> {
        if let Some(previous) = self.armed.take() {
            previous.cancel.cancel();
        }

        let ticket = TimerTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);

        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();
        let on_expiry = self.on_expiry.clone();
        let task = self.runtime.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => on_expiry(ticket),
            }
        });

        trace!(
            timer = %self.name,
            %ticket,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Timer armed"
        );

        self.armed = Some(Armed {
            ticket,
            cancel,
            task,
        });
        Ok(ticket)
    }

    fn stop(&mut self, ticket: TimerTicket) -> Result<(), TimerError> {
        if self
            .armed
            .as_ref()
            .is_some_and(|armed| armed.ticket == ticket)
        {
            if let Some(armed) = self.armed.take() {
                armed.cancel.cancel();
                trace!(timer = %self.name, %ticket, "Timer stopped");
            }
        }
        Ok(())
    }

    fn is_pending(&self, ticket: TimerTicket) -> bool {
        self.armed.as_ref().is_some_and(|armed| {
            armed.ticket == ticket && !armed.cancel.is_cancelled() && !armed.task.is_finished()
        })
    }
}

impl Drop for TokioOneShot {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.cancel.cancel();
        }
    }
}
