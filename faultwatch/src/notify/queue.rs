use tokio::sync::mpsc;

use super::{Notification, NotifyChannel, NotifyError};

/// Enqueue-and-return channel.
///
/// Hands an owned copy of each notification to an `mpsc` receiver, usually
/// a task that owns the real transport. The alarm only learns whether the
/// message was queued: a full or closed queue counts as a failed delivery,
/// so the failure alert stays eligible for the next trigger.
#[derive(Debug, Clone)]
pub struct QueueChannel {
    tx: mpsc::Sender<Notification>,
}

impl QueueChannel {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Create a channel together with the receiving end of its queue.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl NotifyChannel for QueueChannel {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.tx
            .try_send(notification.clone())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => NotifyError::Full,
                mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
            })
    }
}
