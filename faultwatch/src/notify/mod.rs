//! Notification payloads and the channels that deliver them.
//!
//! The alarm never talks to a transport directly. It hands a fully formed
//! [`Notification`] to a [`NotifyChannel`] and trusts the result: `Ok` means
//! the failure alert for the current episode is delivered, an error means a
//! later trigger may try again.

mod log;
mod queue;

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmStatus;

pub use log::LogChannel;
pub use queue::QueueChannel;

bitflags! {
    /// Delivery hints passed through to the channel untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MessageOptions: u32 {
        /// Route to the chat (Telegram) transport.
        const TELEGRAM = 1 << 0;
        /// Route to the mail transport.
        const MAIL = 1 << 1;
        /// Deliver without an audible notification.
        const SILENT = 1 << 2;
        /// Mark as high priority where the transport supports it.
        const HIGH_PRIORITY = 1 << 3;
    }
}

/// Which edge of an episode a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Failure,
    Recovery,
}

/// Everything a channel needs to format and route one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Service identity the alarm was constructed with.
    pub alarm: String,
    /// Object label: the per-call override, or the service name.
    pub object: String,
    pub kind: NotificationKind,
    /// Message template for this kind; see [`Notification::render`].
    pub template: String,
    pub options: MessageOptions,
    pub status: AlarmStatus,
    /// Unix time the failure episode started, if one is in progress.
    pub failure_since: Option<i64>,
    /// Unix time of the status change being reported.
    pub changed_at: i64,
}

impl Notification {
    /// Seconds between the start of the episode and the reported change.
    pub fn failure_duration(&self) -> Option<i64> {
        self.failure_since.map(|since| self.changed_at - since)
    }

    /// Expand the template.
    ///
    /// Recognized placeholders are `{object}`, `{status}` and `{duration}`
    /// (episode length in seconds, empty when unknown). Anything else is
    /// left as written.
    pub fn render(&self) -> String {
        let duration = self
            .failure_duration()
            .map(|secs| secs.to_string())
            .unwrap_or_default();
        self.template
            .replace("{object}", &self.object)
            .replace("{status}", &self.status.to_string())
            .replace("{duration}", &duration)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.render())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("channel closed")]
    Closed,

    #[error("channel full")]
    Full,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers notifications.
///
/// Called synchronously with the alarm's lock held, from either the caller
/// of `set_state` or the timer's execution context. Implementations must not
/// call back into the alarm that invoked them, and should return quickly;
/// slow transports belong behind a queue such as [`QueueChannel`].
pub trait NotifyChannel: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

impl<F> NotifyChannel for F
where
    F: Fn(&Notification) -> Result<(), NotifyError> + Send + Sync,
{
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self(notification)
    }
}
