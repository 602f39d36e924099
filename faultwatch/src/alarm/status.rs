use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque error code reported by the monitored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultCode(pub i32);

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Latest observed condition of a monitored object.
///
/// Threshold alarms only distinguish `Ok` from everything else. Graded
/// alarms also tell a slowdown (`Degraded`) apart from a full `Failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmStatus {
    #[default]
    Ok,
    Degraded,
    Failure(FaultCode),
    /// The object reports itself as intentionally out of service.
    Suppressed,
}

impl AlarmStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, AlarmStatus::Ok)
    }

    /// Whether this status can start or continue a failure episode.
    pub fn is_failing(self) -> bool {
        matches!(self, AlarmStatus::Degraded | AlarmStatus::Failure(_))
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmStatus::Ok => f.write_str("ok"),
            AlarmStatus::Degraded => f.write_str("degraded"),
            AlarmStatus::Failure(code) => write!(f, "failure({code})"),
            AlarmStatus::Suppressed => f.write_str("suppressed"),
        }
    }
}

/// Which of the two status encodings an alarm works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AlarmMode {
    /// Binary status with a consecutive-failure threshold.
    Threshold {
        /// Failing observations in a row before a failure is real. `0` and
        /// `1` both alert on the first one.
        failures: u8,
    },

    /// Graded status; a partial recovery never downgrades a full failure.
    Graded,
}

impl Default for AlarmMode {
    fn default() -> Self {
        AlarmMode::Threshold { failures: 1 }
    }
}

impl AlarmMode {
    /// Status to adopt for a failing observation, or `None` to ignore it.
    ///
    /// In graded mode `Degraded` while in `Failure` is a partial recovery
    /// signal. Only a full `Ok` may clear an active failure, so the
    /// observation is dropped.
    pub fn resolve(self, current: AlarmStatus, observed: AlarmStatus) -> Option<AlarmStatus> {
        match (self, current, observed) {
            (AlarmMode::Graded, AlarmStatus::Failure(_), AlarmStatus::Degraded) => None,
            _ => Some(observed),
        }
    }

    /// Whether `consecutive_failures` is enough to consider the failure real.
    pub fn threshold_met(self, consecutive_failures: u8) -> bool {
        match self {
            AlarmMode::Threshold { failures } => consecutive_failures >= failures,
            AlarmMode::Graded => true,
        }
    }

    pub fn counts_failures(self) -> bool {
        matches!(self, AlarmMode::Threshold { .. })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid alarm mode {0:?}, expected \"graded\" or \"threshold[:N]\"")]
pub struct ParseModeError(String);

impl FromStr for AlarmMode {
    type Err = ParseModeError;

    /// Parse `graded`, `threshold` or `threshold:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseModeError(s.to_string());
        match s.split_once(':') {
            None if s == "graded" => Ok(AlarmMode::Graded),
            None if s == "threshold" => Ok(AlarmMode::default()),
            Some(("threshold", n)) => n
                .parse()
                .map(|failures| AlarmMode::Threshold { failures })
                .map_err(|_| err()),
            _ => Err(err()),
        }
    }
}
