use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::{AlarmMode, NotifyPolicy};
use crate::error::{Error, Result};
use crate::notify::MessageOptions;

/// Fixed identity of one alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Service name. Also the object label when no override is set.
    pub service: String,

    pub policy: NotifyPolicy,

    pub mode: AlarmMode,

    /// Template for recovery notifications. `None` disables them.
    pub message_ok: Option<String>,

    /// Template for failure notifications. `None` disables them.
    pub message_failure: Option<String>,

    pub options: MessageOptions,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            service: "service".to_string(),
            policy: NotifyPolicy::AutoRecovery,
            mode: AlarmMode::default(),
            message_ok: Some("{object}: recovered after {duration} s".to_string()),
            message_failure: Some("{object}: failure ({status})".to_string()),
            options: MessageOptions::TELEGRAM,
        }
    }
}

impl AlarmConfig {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            return Err(Error::Config("service name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Settings owned by the surrounding configuration and re-read on every use.
///
/// Either value may change at any time; the alarm never caches them. An
/// absent confirm delay means failures are reported immediately and every
/// recovery is long enough. An absent enable gate means notifications are
/// always enabled.
#[derive(Debug, Clone, Default)]
pub struct LiveSettings {
    pub confirm_delay: Option<watch::Receiver<Duration>>,
    pub enabled: Option<watch::Receiver<bool>>,
}

impl LiveSettings {
    pub fn confirm_delay(&self) -> Option<Duration> {
        self.confirm_delay.as_ref().map(|rx| *rx.borrow())
    }

    pub fn notifications_enabled(&self) -> bool {
        self.enabled.as_ref().is_none_or(|rx| *rx.borrow())
    }
}
