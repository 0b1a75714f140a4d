//! Task record collaborator.
//!
//! The host application owns task records; the core only reads and rewrites
//! a handful of fields through [`TaskStore`]. Implementations must give
//! read-your-own-writes semantics within one operation.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, StoreError};

pub const REMINDER_NUM: &str = "reminder_num";
pub const FREQUENCY_PREF: &str = "frequency_pref";
pub const REPEAT_TRIGGER_COUNT: &str = "repeat_trigger_count";
pub const HISTORY: &str = "history";

/// Key-value view of a single task.
pub trait TaskStore {
    /// Stored value for `key`, if any.
    fn get_field(&self, key: &str) -> Option<Value>;

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    /// When the external scheduler should next fire this task.
    fn trigger_timestamp(&self) -> Option<DateTime<Utc>>;

    fn set_trigger_timestamp(&mut self, at: DateTime<Utc>) -> Result<(), StoreError>;

    fn is_completed(&self) -> bool;

    fn mark_completed(&mut self, completed: bool) -> Result<(), StoreError>;

    /// Stored value for `key`, or `default` when absent.
    fn get_field_or(&self, key: &str, default: Value) -> Value {
        self.get_field(key).unwrap_or(default)
    }
}

/// In-memory task record, serializable as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Command the task was created with (e.g. `memorize-spanish@example.com`).
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub stored_data: BTreeMap<String, Value>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub trigger_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

impl TaskRecord {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Read a record from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()).into());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the record to a JSON file.
    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl TaskStore for TaskRecord {
    fn get_field(&self, key: &str) -> Option<Value> {
        self.stored_data.get(key).cloned()
    }

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.stored_data.insert(key.to_string(), value);
        Ok(())
    }

    fn trigger_timestamp(&self) -> Option<DateTime<Utc>> {
        self.trigger_time
    }

    fn set_trigger_timestamp(&mut self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.trigger_time = Some(at);
        Ok(())
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn mark_completed(&mut self, completed: bool) -> Result<(), StoreError> {
        self.completed = completed;
        Ok(())
    }
}
