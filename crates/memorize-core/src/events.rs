use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::reminder::Outcome;

/// Prefix of every action string handled by this library.
pub const ACTION_NAMESPACE: &str = "mem";

/// Something that happened to a task in the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Unique per delivery attempt of the same logical event; used for dedup.
    pub id: String,
    /// Command the task was created with.
    #[serde(default)]
    pub command: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// Task was just created.
    Created,
    /// The scheduler fired the task.
    Triggered,
    /// User clicked an action button (e.g. `mem.check.yes`).
    Action { action: String },
}

/// A decoded `mem.*` action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemorizeAction {
    /// `mem.check.yes` / `mem.check.no`
    Check(Outcome),
    /// `mem.freq.2-5` selects frequency 2.5
    Frequency(f64),
}

impl MemorizeAction {
    /// Decode an action string. Actions outside the `mem.check` / `mem.freq`
    /// families return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// `InvalidOutcome` for an unknown check answer, `InvalidPreference` for
    /// a frequency that is not a positive number.
    pub fn parse(action: &str) -> Result<Option<Self>> {
        let mut parts = action.splitn(3, '.');
        if parts.next() != Some(ACTION_NAMESPACE) {
            return Ok(None);
        }
        match (parts.next(), parts.next()) {
            (Some("check"), Some(answer)) => Ok(Some(MemorizeAction::Check(answer.parse()?))),
            (Some("check"), None) => Err(CoreError::InvalidOutcome(String::new())),
            (Some("freq"), Some(raw)) => {
                let pref = raw.replacen('-', ".", 1).parse::<f64>().unwrap_or(f64::NAN);
                if !(pref > 0.0) {
                    return Err(CoreError::InvalidPreference(pref));
                }
                Ok(Some(MemorizeAction::Frequency(pref)))
            }
            _ => Ok(None),
        }
    }
}

/// Action string that selects `frequency_pref`; the decimal point is
/// encoded as `-` so it does not clash with the separator.
pub fn frequency_action(frequency_pref: f64) -> String {
    format!(
        "{ACTION_NAMESPACE}.freq.{}",
        frequency_pref.to_string().replacen('.', "-", 1)
    )
}

/// Action string for a "did you remember?" answer.
pub fn check_action(outcome: Outcome) -> String {
    let answer = match outcome {
        Outcome::Remembered => "yes",
        Outcome::Forgotten => "no",
    };
    format!("{ACTION_NAMESPACE}.check.{answer}")
}
