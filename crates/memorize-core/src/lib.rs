//! # Memorize Core Library
//!
//! This library provides the scheduling core for spaced-repetition reminders:
//! given how often a reminder has been answered and how frequently the user
//! wants to be reminded, it decides when the next reminder is due and tracks
//! escalation of unanswered reminders.
//!
//! ## Architecture
//!
//! - **Interval calculator**: pure functions on `(reminder_num + 1)^exponent * pref`
//! - **Reminder state machine**: `start`, `acknowledge`, `change_frequency` and
//!   `on_retrigger` transitions over a task record owned by the host
//! - **Storage**: TOML configuration and the [`TaskStore`] collaborator trait
//! - **Dispatch**: host events routed to the state machine with event-id dedup
//!
//! ## Key Components
//!
//! - [`Memorizer`]: Reminder state machine
//! - [`next_interval`]: Interval curve
//! - [`MemorizeConfig`]: Deployment configuration
//! - [`Clock`]: Injectable time source

pub mod clock;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod interval;
pub mod preview;
pub mod reminder;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{Dispatch, Dispatcher};
pub use error::{ConfigError, CoreError, StoreError};
pub use events::{EventKind, MemorizeAction, TaskEvent};
pub use interval::{friendly_date, future_intervals, next_interval, FriendlyDate, FutureIntervals};
pub use reminder::{
    AcknowledgeReport, MemInfo, Memorizer, Outcome, ReminderPhase, RepeatCount, RetriggerReport,
};
pub use storage::{
    ExtensionPrefs, ExtensionSettings, FrequencyOptions, MemorizeConfig, TaskRecord, TaskStore,
};
