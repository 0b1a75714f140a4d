//! Typed view of a task's memorization fields.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::storage::task::{self, TaskStore};

/// Maximum number of acknowledgments kept per task.
pub const HISTORY_CAP: usize = 500;

/// Stored marker for "no reminder has fired since the last response".
const NOT_STARTED: &str = "no_reminders";

/// How many times the current reminder has fired without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum RepeatCount {
    /// Nothing sent since the last acknowledgment.
    #[default]
    NotStarted,
    /// `Count(0)` is the first send, `Count(n)` the n-th repeat.
    Count(u32),
}

impl RepeatCount {
    /// Count after one more send of the same reminder.
    pub fn next_count(self) -> u32 {
        match self {
            RepeatCount::NotStarted => 0,
            RepeatCount::Count(n) => n.saturating_add(1),
        }
    }

    /// Line shown above an escalated reminder.
    pub fn notice(self) -> &'static str {
        match self {
            RepeatCount::NotStarted | RepeatCount::Count(0) => "",
            RepeatCount::Count(1) => {
                "Were you able to remember? We will send 2 more reminders before turning off this memorization."
            }
            RepeatCount::Count(2) => {
                "Were you able to remember? We will send 1 more reminder before turning off this memorization."
            }
            RepeatCount::Count(_) => {
                "This memorization has been paused. To re-enable it, answer 'yes' or 'no'."
            }
        }
    }

    fn decode(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) if s == NOT_STARTED => Ok(RepeatCount::NotStarted),
            Value::Number(_) => whole_number(value)
                .and_then(|n| u32::try_from(n).ok())
                .map(RepeatCount::Count)
                .ok_or_else(|| corrupt(task::REPEAT_TRIGGER_COUNT, value)),
            other => Err(corrupt(task::REPEAT_TRIGGER_COUNT, other)),
        }
    }
}

impl TryFrom<Value> for RepeatCount {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self> {
        Self::decode(&value)
    }
}

impl From<RepeatCount> for Value {
    fn from(count: RepeatCount) -> Self {
        match count {
            RepeatCount::NotStarted => Value::String(NOT_STARTED.into()),
            RepeatCount::Count(n) => json!(n),
        }
    }
}

/// User's answer to "did you remember?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[serde(alias = "yes")]
    Remembered,
    #[serde(alias = "no")]
    Forgotten,
}

impl FromStr for Outcome {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yes" | "remembered" => Ok(Outcome::Remembered),
            "no" | "forgotten" => Ok(Outcome::Forgotten),
            other => Err(CoreError::InvalidOutcome(other.to_string())),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Remembered => f.write_str("remembered"),
            Outcome::Forgotten => f.write_str("forgotten"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub at: DateTime<Utc>,
    pub outcome: Outcome,
}

/// Entry shapes accepted when reading a stored history.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Current(HistoryEntry),
    /// `{ "date": <unix millis>, "mem": "yes" }`
    Legacy { date: i64, mem: Outcome },
}

impl StoredEntry {
    fn into_entry(self) -> Option<HistoryEntry> {
        match self {
            StoredEntry::Current(entry) => Some(entry),
            StoredEntry::Legacy { date, mem } => Some(HistoryEntry {
                at: DateTime::from_timestamp_millis(date)?,
                outcome: mem,
            }),
        }
    }
}

/// Acknowledgment log, oldest first, never longer than [`HISTORY_CAP`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(VecDeque<HistoryEntry>);

impl History {
    /// Append an entry, evicting the oldest one if the log is full.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.0.len() >= HISTORY_CAP {
            self.0.pop_front();
        }
        self.0.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.0.back()
    }

    /// Read a stored history. Unreadable entries are skipped one by one;
    /// only a value that is not an array at all yields an empty history.
    fn decode(value: Option<Value>) -> Self {
        let entries = match value {
            None | Some(Value::Null) => return Self::default(),
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                warn!(found = %other, "memorization history is not a list, starting a new one");
                return Self::default();
            }
        };
        let mut history: VecDeque<HistoryEntry> = entries
            .into_iter()
            .filter_map(|raw| {
                let entry = serde_json::from_value::<StoredEntry>(raw.clone())
                    .ok()
                    .and_then(StoredEntry::into_entry);
                if entry.is_none() {
                    warn!(entry = %raw, "skipping unreadable history entry");
                }
                entry
            })
            .collect();
        if history.len() > HISTORY_CAP {
            history.drain(..history.len() - HISTORY_CAP);
        }
        Self(history)
    }
}

/// Where a task sits in the reminder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPhase {
    /// A reminder went out and has not been answered.
    AwaitingResponse,
    /// Waiting for the next due date.
    Scheduled,
    /// Too many unanswered reminders; no further autonomous triggers.
    Suspended,
}

/// Snapshot of the memorization fields of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorizationState {
    pub reminder_num: u32,
    pub frequency_pref: f64,
    pub repeat_count: RepeatCount,
    pub history: History,
    pub completed: bool,
    pub trigger_time: Option<DateTime<Utc>>,
}

impl MemorizationState {
    /// Read the task's fields, filling absent ones from defaults.
    ///
    /// # Errors
    ///
    /// `CorruptState` if a stored counter or preference has the wrong shape.
    pub fn load<S: TaskStore + ?Sized>(store: &S, default_frequency_pref: f64) -> Result<Self> {
        let frequency_pref = match store.get_field(task::FREQUENCY_PREF) {
            None | Some(Value::Null) => default_frequency_pref,
            Some(value) => decode_frequency_pref(&value)?,
        };
        Self::load_with_pref(store, frequency_pref)
    }

    /// Like [`MemorizationState::load`], but uses `frequency_pref` without
    /// reading the stored preference, so a task whose preference is about
    /// to be replaced can still be loaded when that field is unreadable.
    pub fn load_with_pref<S: TaskStore + ?Sized>(store: &S, frequency_pref: f64) -> Result<Self> {
        let reminder_num = match store.get_field(task::REMINDER_NUM) {
            None | Some(Value::Null) => 0,
            Some(value) => decode_reminder_num(&value)?,
        };
        let repeat_count = match store.get_field(task::REPEAT_TRIGGER_COUNT) {
            None | Some(Value::Null) => RepeatCount::NotStarted,
            Some(value) => RepeatCount::decode(&value)?,
        };
        Ok(Self {
            reminder_num,
            frequency_pref,
            repeat_count,
            history: History::decode(store.get_field(task::HISTORY)),
            completed: store.is_completed(),
            trigger_time: store.trigger_timestamp(),
        })
    }

    pub fn phase(&self) -> ReminderPhase {
        if self.completed {
            ReminderPhase::Suspended
        } else if matches!(self.repeat_count, RepeatCount::Count(_)) {
            ReminderPhase::AwaitingResponse
        } else {
            ReminderPhase::Scheduled
        }
    }
}

fn corrupt(key: &str, found: &Value) -> CoreError {
    CoreError::CorruptState {
        key: key.to_string(),
        found: found.to_string(),
    }
}

/// Integer value of a JSON number, accepting whole floats such as `2.0`.
fn whole_number(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_i64().or_else(|| {
        let f = n.as_f64()?;
        (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
    })
}

fn decode_reminder_num(value: &Value) -> Result<u32> {
    // Older records may hold a negative count; those mean "start of the curve".
    match whole_number(value) {
        Some(n) if n < 0 => Ok(0),
        Some(n) => u32::try_from(n).map_err(|_| corrupt(task::REMINDER_NUM, value)),
        None => Err(corrupt(task::REMINDER_NUM, value)),
    }
}

fn decode_frequency_pref(value: &Value) -> Result<f64> {
    let pref = match value {
        Value::Number(n) => n.as_f64(),
        // Preferences set from an action string arrive as text.
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    pref.ok_or_else(|| corrupt(task::FREQUENCY_PREF, value))
}
