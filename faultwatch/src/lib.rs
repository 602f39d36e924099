//! Debounced failure/recovery alarms.
//!
//! Monitored objects (sensors, links, peripherals) report their status on
//! every observation. A [`DebouncedAlarm`] turns that noisy stream into a
//! small number of notifications: one when a failure is confirmed, one when
//! it clears, gated by a [`NotifyPolicy`], a failure threshold, and an
//! optional confirmation delay.

pub mod alarm;
pub mod clock;
pub mod error;
pub mod notify;
pub mod timer;
pub mod tracing;

pub use alarm::{
    AlarmConfig, AlarmMode, AlarmSnapshot, AlarmStatus, DebouncedAlarm, FaultCode, LiveSettings,
    NotifyPolicy, Observation,
};
pub use notify::{
    LogChannel, MessageOptions, Notification, NotificationKind, NotifyChannel, NotifyError,
    QueueChannel,
};
pub use timer::{OneShotTimer, TimerError, TimerService, TimerTicket, TokioTimerService};
