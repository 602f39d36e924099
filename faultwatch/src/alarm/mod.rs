//! A debounced alarm that turns a stream of status observations into
//! failure and recovery notifications.
//!
//! Useful for alerting on sustained problems while ignoring transients
//! that resolve on their own.
//!
//! # State Machine
//!
//! ```text
//!            failing, below threshold / delay running
//!           ┌───────────┐
//!           ▼           │   threshold met and delay elapsed
//!   Ok ──────────► Failing ───────────────────────────► Alerted
//!   ▲   failing       │  (timer armed for the full delay)   │
//!   │                 │                                     │
//!   │   ok (recovery notice if policy and delay allow)      │
//!   └─────────────────┴─────────────────────────────────────┘
//!   ▲
//!   └──── lock() / unlock(): forced to Ok, episode forgotten
//! ```
//!
//! - **Ok:** nothing wrong, no episode in progress.
//! - **Failing:** an episode is in progress. The failure is counted
//!   (threshold mode) and confirmed either immediately, or when the
//!   confirmation timer fires if it has not yet persisted for the
//!   configured delay.
//! - **Alerted:** the failure notification was delivered. Further failing
//!   observations in the same episode are quiet; the next `Ok` may send a
//!   recovery notification.
//!
//! Every mutating entry point, including the timer's expiry callback, takes
//! the same per-alarm mutex.

mod config;
mod machine;
mod policy;
mod status;


use std::sync::Arc;

use parking_lot::Mutex;

pub use config::{AlarmConfig, LiveSettings};
pub use machine::AlarmSnapshot;
pub use policy::NotifyPolicy;
pub use status::{AlarmMode, AlarmStatus, FaultCode, ParseModeError};

use crate::clock::Clock;
use crate::error::Result;
use crate::notify::NotifyChannel;
use crate::timer::{ExpiryCallback, TimerError, TimerService};
use crate::tracing::prelude::*;
use machine::AlarmCore;

/// One status report from the monitored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub status: AlarmStatus,
    /// Unix time of the observation in seconds; `0` means "now".
    pub observed_at: i64,
    /// Skip the confirm delay for this observation's failure notice.
    pub forced: bool,
    /// Replaces the object label, even if the observation is otherwise
    /// ignored.
    pub label: Option<String>,
}

impl Observation {
    pub fn new(status: AlarmStatus) -> Self {
        Self {
            status,
            observed_at: 0,
            forced: false,
            label: None,
        }
    }

    pub fn at(mut self, observed_at: i64) -> Self {
        self.observed_at = observed_at;
        self
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<AlarmStatus> for Observation {
    fn from(status: AlarmStatus) -> Self {
        Self::new(status)
    }
}

/// Debounced failure/recovery alarm for one monitored object.
///
/// Owns the alarm state behind a mutex and the confirmation timer. The
/// timer's callback only holds a weak reference, so dropping the alarm
/// cancels the pending arm and any expiry already in flight finds nothing
/// to act on.
pub struct DebouncedAlarm {
    core: Arc<Mutex<AlarmCore>>,
}

impl DebouncedAlarm {
    /// Create an alarm and its confirmation timer.
    ///
    /// Fails if the configuration is invalid or the timer service cannot
    /// provide a timer.
    pub fn new(
        config: AlarmConfig,
        channel: Arc<dyn NotifyChannel>,
        timers: &dyn TimerService,
    ) -> Result<Self> {
        config.validate()?;
        let timer_name = format!("alarm:{}", config.service);

        let core = Arc::new(Mutex::new(AlarmCore::new(config, channel)));
        let weak = Arc::downgrade(&core);
        let on_expiry: ExpiryCallback = Arc::new(move |ticket| {
            if let Some(core) = weak.upgrade() {
                core.lock().on_timer_expired(ticket);
            }
        });

        let timer = timers.create_timer(&timer_name, on_expiry)?;
        core.lock().timer = Some(timer);

        Ok(Self { core })
    }

    /// Replace the clock used for observations without a timestamp.
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        self.core.lock().clock = Arc::new(clock);
        self
    }

    /// Attach the externally owned confirm delay and enable gate.
    pub fn attach_settings(&self, settings: LiveSettings) {
        self.core.lock().settings = settings;
    }

    /// Report a new status. `observed_at` of `0` means "now".
    pub fn set_state(&self, status: AlarmStatus, observed_at: i64) {
        self.observe(Observation::new(status).at(observed_at));
    }

    /// Report a new status with per-call options.
    pub fn observe(&self, observation: impl Into<Observation>) {
        self.core.lock().observe(observation.into());
    }

    /// Run the pending delayed confirmation now instead of waiting for the
    /// timer. No-op when no confirmation is pending.
    pub fn forced_timeout(&self) {
        self.core.lock().forced_timeout();
    }

    /// Suppress the alarm, e.g. for a maintenance window.
    pub fn lock(&self) {
        self.core.lock().lock();
    }

    pub fn unlock(&self) {
        self.core.lock().unlock();
    }

    pub fn is_locked(&self) -> bool {
        self.core.lock().is_locked()
    }

    pub fn status(&self) -> AlarmStatus {
        self.core.lock().status()
    }

    /// Whether the failure alert for the current episode was delivered.
    pub fn alert_sent(&self) -> bool {
        self.core.lock().alert_sent()
    }

    pub fn timer_pending(&self) -> bool {
        self.core.lock().timer_pending()
    }

    pub fn snapshot(&self) -> AlarmSnapshot {
        self.core.lock().snapshot()
    }

    /// Stop the confirmation timer and release the alarm, reporting a
    /// failure to stop.
    pub fn destroy(self) -> std::result::Result<(), TimerError> {
        self.core.lock().shutdown()
    }
}

impl Drop for DebouncedAlarm {
    fn drop(&mut self) {
        if let Err(e) = self.core.lock().shutdown() {
            warn!(error = %e, "Alarm dropped with a timer that failed to stop");
        }
    }
}
