//! The alarm state machine proper.
//!
//! Everything here runs with the owning alarm's mutex held, both when
//! driven by the caller and when re-entered from the timer.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::{AlarmConfig, AlarmStatus, LiveSettings, Observation};
use crate::clock::{Clock, SystemClock};
use crate::notify::{Notification, NotificationKind, NotifyChannel};
use crate::timer::{OneShotTimer, TimerError, TimerTicket};
use crate::tracing::prelude::*;

/// Point-in-time view of an alarm's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmSnapshot {
    pub service: String,
    pub object: String,
    pub status: AlarmStatus,
    pub locked: bool,
    pub alert_sent: bool,
    pub consecutive_failures: u8,
    pub failure_since: Option<i64>,
    pub changed_at: i64,
    pub timer_pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Failed,
    /// Not attempted: disabled, locked, or no template for this kind.
    Skipped,
}

pub(super) struct AlarmCore {
    config: AlarmConfig,
    pub(super) settings: LiveSettings,
    channel: Arc<dyn NotifyChannel>,
    pub(super) clock: Arc<dyn Clock>,
    /// Set right after construction; only `None` once shut down.
    pub(super) timer: Option<Box<dyn OneShotTimer>>,
    /// Ticket of the outstanding confirmation arm.
    pending: Option<TimerTicket>,
    label: Option<String>,
    status: AlarmStatus,
    changed_at: i64,
    failure_since: Option<i64>,
    consecutive_failures: u8,
    alert_sent: bool,
    locked: bool,
}

impl AlarmCore {
    pub(super) fn new(config: AlarmConfig, channel: Arc<dyn NotifyChannel>) -> Self {
        Self {
            config,
            settings: LiveSettings::default(),
            channel,
            clock: Arc::new(SystemClock),
            timer: None,
            pending: None,
            label: None,
            status: AlarmStatus::Ok,
            changed_at: 0,
            failure_since: None,
            consecutive_failures: 0,
            alert_sent: false,
            locked: false,
        }
    }

    fn object(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.config.service)
    }

    pub(super) fn observe(&mut self, observation: Observation) {
        let Observation {
            status,
            observed_at,
            forced,
            label,
        } = observation;

        if let Some(label) = label {
            self.label = Some(label);
        }

        if self.locked {
            trace!(
                alarm = %self.config.service,
                status = %status,
                "Alarm locked, observation ignored"
            );
            return;
        }

        let at = if observed_at > 0 {
            observed_at
        } else {
            self.clock.now()
        };

        match status {
            AlarmStatus::Ok => self.recover(at),
            AlarmStatus::Suppressed => self.suppress(at),
            AlarmStatus::Degraded | AlarmStatus::Failure(_) => self.fail(status, at, forced),
        }
    }

    fn recover(&mut self, at: i64) {
        if self.status.is_ok() {
            return;
        }

        let previous = self.status;
        self.status = AlarmStatus::Ok;
        self.changed_at = at;
        self.cancel_timer().ok();

        debug!(
            alarm = %self.config.service,
            object = %self.object(),
            from = %previous,
            "Recovered"
        );

        if let Some(since) = self.failure_since {
            if self.config.policy.notifies_recovery(self.alert_sent)
                && self.delay_elapsed(at - since)
            {
                self.send(NotificationKind::Recovery);
            } else {
                trace!(
                    alarm = %self.config.service,
                    policy = %self.config.policy,
                    alert_sent = self.alert_sent,
                    duration_s = at - since,
                    "Recovery notice not due"
                );
            }
        }

        self.reset_episode();
    }

    fn suppress(&mut self, at: i64) {
        self.cancel_timer().ok();
        self.reset_episode();
        if self.status != AlarmStatus::Suppressed {
            debug!(
                alarm = %self.config.service,
                from = %self.status,
                "Object suppressed"
            );
            self.status = AlarmStatus::Suppressed;
            self.changed_at = at;
        }
    }

    fn fail(&mut self, observed: AlarmStatus, at: i64, forced: bool) {
        let Some(next) = self.config.mode.resolve(self.status, observed) else {
            trace!(
                alarm = %self.config.service,
                current = %self.status,
                observed = %observed,
                "Partial recovery ignored during failure"
            );
            return;
        };

        if next != self.status {
            debug!(
                alarm = %self.config.service,
                object = %self.object(),
                from = %self.status,
                to = %next,
                "Status changed"
            );
        }

        self.status = next;
        self.changed_at = at;
        let since = *self.failure_since.get_or_insert(at);
        if self.config.mode.counts_failures() {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }

        if !self.failure_notice_due() {
            return;
        }

        if forced || self.delay_elapsed(at - since) {
            self.send_failure();
        } else {
            self.arm_timer();
        }
    }

    fn failure_notice_due(&self) -> bool {
        self.config.policy.notifies_failure()
            && self.config.mode.threshold_met(self.consecutive_failures)
            && !self.alert_sent
            && !self.timer_pending()
    }

    /// Whether `elapsed` seconds satisfy the confirm delay as read right now.
    fn delay_elapsed(&self, elapsed: i64) -> bool {
        match self.settings.confirm_delay() {
            None => true,
            Some(delay) => elapsed >= i64::try_from(delay.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Arm the confirmation timer for the full configured delay.
    ///
    /// The delay restarts from now rather than from the start of the
    /// episode, so the first alert can come up to nearly twice the delay
    /// after the failure began.
    fn arm_timer(&mut self) {
        let delay = self.settings.confirm_delay().unwrap_or(Duration::ZERO);
        if delay.is_zero() {
            self.send_failure();
            return;
        }

        let armed = match self.timer.as_mut() {
            Some(timer) => timer.start(delay),
            None => Err(TimerError::Start("timer shut down".to_string())),
        };

        match armed {
            Ok(ticket) => {
                self.pending = Some(ticket);
                debug!(
                    alarm = %self.config.service,
                    %ticket,
                    delay_s = delay.as_secs(),
                    "Failure confirmation timer armed"
                );
            }
            Err(e) => {
                warn!(
                    alarm = %self.config.service,
                    error = %e,
                    "Cannot arm confirmation timer, notifying now"
                );
                self.send_failure();
            }
        }
    }

    pub(super) fn timer_pending(&self) -> bool {
        match (self.pending, self.timer.as_ref()) {
            (Some(ticket), Some(timer)) => timer.is_pending(ticket),
            _ => false,
        }
    }

    fn cancel_timer(&mut self) -> Result<(), TimerError> {
        let Some(ticket) = self.pending.take() else {
            return Ok(());
        };
        let Some(timer) = self.timer.as_mut() else {
            return Ok(());
        };
        timer.stop(ticket).inspect_err(|e| {
            warn!(
                alarm = %self.config.service,
                %ticket,
                error = %e,
                "Failed to stop confirmation timer"
            );
        })
    }

    pub(super) fn on_timer_expired(&mut self, ticket: TimerTicket) {
        if self.pending != Some(ticket) {
            trace!(
                alarm = %self.config.service,
                %ticket,
                "Stale timer expiry ignored"
            );
            return;
        }
        self.pending = None;
        self.finish_delayed();
    }

    pub(super) fn forced_timeout(&mut self) {
        if self.timer_pending() {
            self.cancel_timer().ok();
            self.finish_delayed();
        }
    }

    fn finish_delayed(&mut self) {
        if self.locked || !self.status.is_failing() || self.alert_sent {
            trace!(
                alarm = %self.config.service,
                status = %self.status,
                alert_sent = self.alert_sent,
                "Delayed failure notice no longer due"
            );
            return;
        }
        self.send_failure();
    }

    fn send_failure(&mut self) {
        if self.send(NotificationKind::Failure) == Delivery::Delivered {
            self.alert_sent = true;
        }
    }

    fn send(&self, kind: NotificationKind) -> Delivery {
        if self.locked {
            return Delivery::Skipped;
        }

        if !self.settings.notifications_enabled() {
            debug!(
                alarm = %self.config.service,
                %kind,
                "Notifications disabled, skipping"
            );
            return Delivery::Skipped;
        }

        let template = match kind {
            NotificationKind::Failure => self.config.message_failure.as_ref(),
            NotificationKind::Recovery => self.config.message_ok.as_ref(),
        };
        let Some(template) = template else {
            trace!(alarm = %self.config.service, %kind, "No template, skipping");
            return Delivery::Skipped;
        };

        let notification = Notification {
            alarm: self.config.service.clone(),
            object: self.object().to_string(),
            kind,
            template: template.clone(),
            options: self.config.options,
            status: self.status,
            failure_since: self.failure_since,
            changed_at: self.changed_at,
        };

        match self.channel.notify(&notification) {
            Ok(()) => {
                info!(
                    alarm = %notification.alarm,
                    object = %notification.object,
                    %kind,
                    status = %notification.status,
                    "Notification sent"
                );
                Delivery::Delivered
            }
            Err(e) => {
                warn!(
                    alarm = %notification.alarm,
                    object = %notification.object,
                    %kind,
                    error = %e,
                    "Notification delivery failed"
                );
                Delivery::Failed
            }
        }
    }

    fn reset_episode(&mut self) {
        self.alert_sent = false;
        self.failure_since = None;
        self.consecutive_failures = 0;
    }

    pub(super) fn lock(&mut self) {
        if self.locked {
            return;
        }
        self.cancel_timer().ok();
        self.reset_episode();
        self.status = AlarmStatus::Ok;
        self.locked = true;
        info!(alarm = %self.config.service, "Alarm locked");
    }

    pub(super) fn unlock(&mut self) {
        if !self.locked {
            return;
        }
        self.locked = false;
        self.reset_episode();
        self.status = AlarmStatus::Ok;
        info!(alarm = %self.config.service, "Alarm unlocked");
    }

    pub(super) fn is_locked(&self) -> bool {
        self.locked
    }

    pub(super) fn status(&self) -> AlarmStatus {
        self.status
    }

    pub(super) fn alert_sent(&self) -> bool {
        self.alert_sent
    }

    pub(super) fn snapshot(&self) -> AlarmSnapshot {
        AlarmSnapshot {
            service: self.config.service.clone(),
            object: self.object().to_string(),
            status: self.status,
            locked: self.locked,
            alert_sent: self.alert_sent,
            consecutive_failures: self.consecutive_failures,
            failure_since: self.failure_since,
            changed_at: self.changed_at,
            timer_pending: self.timer_pending(),
        }
    }

    /// Stop any pending arm and release the timer.
    ///
    /// The ticket is cleared even if stopping fails, so a late expiry is
    /// treated as stale.
    pub(super) fn shutdown(&mut self) -> Result<(), TimerError> {
        let result = self.cancel_timer();
        self.timer = None;
        result
    }
}
