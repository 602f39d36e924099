use serde::{Deserialize, Serialize};

/// Which edges of a failure episode produce a notification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotifyPolicy {
    /// Never notify.
    #[default]
    None,

    /// Notify on failure only.
    FailureOnly,

    /// Notify on recovery only, whether or not a failure alert went out.
    RecoveryOnly,

    /// Notify on failure, and on recovery only if the failure alert was
    /// actually delivered.
    AutoRecovery,

    /// Notify on both edges.
    Forced,
}

impl NotifyPolicy {
    pub fn notifies_failure(self) -> bool {
        matches!(
            self,
            NotifyPolicy::FailureOnly | NotifyPolicy::AutoRecovery | NotifyPolicy::Forced
        )
    }

    pub fn notifies_recovery(self, alert_sent: bool) -> bool {
        match self {
            NotifyPolicy::RecoveryOnly | NotifyPolicy::Forced => true,
            NotifyPolicy::AutoRecovery => alert_sent,
            NotifyPolicy::None | NotifyPolicy::FailureOnly => false,
        }
    }
}
