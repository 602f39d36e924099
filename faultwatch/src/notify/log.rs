use super::{Notification, NotificationKind, NotifyChannel, NotifyError};
use crate::tracing::prelude::*;

/// Channel that writes each notification to the log.
///
/// Failures go out at `warn`, recoveries at `info`. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

impl NotifyChannel for LogChannel {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = notification.render();
        match notification.kind {
            NotificationKind::Failure => warn!(
                alarm = %notification.alarm,
                object = %notification.object,
                status = %notification.status,
                "{message}"
            ),
            NotificationKind::Recovery => info!(
                alarm = %notification.alarm,
                object = %notification.object,
                duration_s = ?notification.failure_duration(),
                "{message}"
            ),
        }
        Ok(())
    }
}
