//! Reminder state machine.
//!
//! ## Transitions
//!
//! ```text
//!              start / change_frequency
//!                        |
//!                        v
//!   +-----------> Scheduled ----- on_retrigger -----> AwaitingResponse
//!   |                                                   |        |
//!   +------------------- acknowledge -------------------+        |
//!   |                                                            |
//!   +-- acknowledge -- Suspended <-- on_retrigger (4th send) ----+
//! ```
//!
//! Every operation validates and computes first and only then writes to the
//! task store, so a failed call leaves the record untouched.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::state::{HistoryEntry, MemorizationState, Outcome, ReminderPhase, RepeatCount};
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::interval::next_interval;
use crate::storage::task::{
    TaskStore, FREQUENCY_PREF, HISTORY, REMINDER_NUM, REPEAT_TRIGGER_COUNT,
};
use crate::storage::{ExtensionPrefs, MemorizeConfig};

/// Sends of the same reminder tolerated before the series is suspended.
pub const MAX_REPEATS: u32 = 2;

/// Nagging interval for unanswered reminders, independent of the curve.
pub fn follow_up_delay() -> Duration {
    Duration::days(1)
}

/// Result of [`Memorizer::acknowledge`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcknowledgeReport {
    pub outcome: Outcome,
    pub reminder_num: u32,
    pub trigger_time: DateTime<Utc>,
    pub history_len: usize,
    /// Status line for the host's response message.
    pub message: String,
}

/// Result of [`Memorizer::on_retrigger`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetriggerReport {
    pub repeat_count: u32,
    pub trigger_time: DateTime<Utc>,
    pub suspended: bool,
    /// Text to show above the reminder.
    pub notice: &'static str,
}

/// Read-only summary of a task's memorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemInfo {
    pub reminder_num: u32,
    pub frequency_pref: f64,
    pub repeat_count: RepeatCount,
    pub phase: ReminderPhase,
    pub trigger_time: Option<DateTime<Utc>>,
    pub history_len: usize,
    /// Due date if the user answers "yes" now.
    pub if_remembered: DateTime<Utc>,
    /// Due date if the user answers "no" now.
    pub if_forgotten: DateTime<Utc>,
}

/// Drives a single task through the reminder lifecycle.
///
/// Holds no per-task state; one instance can serve any number of tasks.
pub struct Memorizer<'a, C: Clock> {
    config: &'a MemorizeConfig,
    clock: C,
}

impl<'a, C: Clock> Memorizer<'a, C> {
    pub fn new(config: &'a MemorizeConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &MemorizeConfig {
        self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn load<S: TaskStore + ?Sized>(
        &self,
        task: &S,
        prefs: &dyn ExtensionPrefs,
    ) -> Result<MemorizationState> {
        let resolved = self.config.resolve(prefs);
        MemorizationState::load(task, resolved.default_frequency_pref)
    }

    fn due(&self, reminder_num: u32, frequency_pref: f64) -> Result<DateTime<Utc>> {
        next_interval(
            i64::from(reminder_num),
            frequency_pref,
            self.config.decay_exponent,
            self.clock.now(),
        )
    }

    /// Begin (or re-arm) memorization of a task.
    ///
    /// Keeps an existing reminder count, fills in the frequency preference
    /// and schedules the next reminder. Callers must deliver each creation
    /// event once; see [`crate::dispatch::Dispatcher`].
    pub fn start<S: TaskStore + ?Sized>(
        &self,
        task: &mut S,
        prefs: &dyn ExtensionPrefs,
    ) -> Result<DateTime<Utc>> {
        let state = self.load(task, prefs)?;
        let trigger = self.due(state.reminder_num, state.frequency_pref)?;

        task.set_field(REMINDER_NUM, json!(state.reminder_num))?;
        task.set_field(FREQUENCY_PREF, json!(state.frequency_pref))?;
        task.set_field(REPEAT_TRIGGER_COUNT, RepeatCount::NotStarted.into())?;
        task.set_trigger_timestamp(trigger)?;

        debug!(
            reminder_num = state.reminder_num,
            frequency_pref = state.frequency_pref,
            trigger = %trigger,
            "memorization scheduled"
        );
        Ok(trigger)
    }

    /// Record the user's answer and move along the curve.
    ///
    /// Remembered advances the reminder count, forgotten steps it back
    /// (never below zero). Acknowledging also revives a suspended series.
    pub fn acknowledge<S: TaskStore + ?Sized>(
        &self,
        task: &mut S,
        prefs: &dyn ExtensionPrefs,
        outcome: Outcome,
    ) -> Result<AcknowledgeReport> {
        let mut state = self.load(task, prefs)?;
        let reminder_num = match outcome {
            Outcome::Remembered => state.reminder_num.saturating_add(1),
            Outcome::Forgotten => state.reminder_num.saturating_sub(1),
        };
        let trigger = self.due(reminder_num, state.frequency_pref)?;
        let now = self.clock.now();
        state.history.push(HistoryEntry { at: now, outcome });

        task.set_field(REMINDER_NUM, json!(reminder_num))?;
        task.set_trigger_timestamp(trigger)?;
        task.set_field(HISTORY, serde_json::to_value(&state.history)?)?;
        task.set_field(REPEAT_TRIGGER_COUNT, RepeatCount::NotStarted.into())?;
        if state.completed {
            info!(reminder_num, "memorization revived by acknowledgment");
        }
        task.mark_completed(false)?;

        debug!(%outcome, reminder_num, trigger = %trigger, "acknowledgment recorded");
        Ok(AcknowledgeReport {
            outcome,
            reminder_num,
            trigger_time: trigger,
            history_len: state.history.len(),
            message: format!(
                "Reminder number {} to {reminder_num}, next due {}",
                match outcome {
                    Outcome::Remembered => "incremented",
                    Outcome::Forgotten => "decremented",
                },
                trigger.to_rfc2822(),
            ),
        })
    }

    /// Switch the task to a new frequency preference and reschedule it.
    ///
    /// The reminder count is preserved, so the task continues along the
    /// curve at the new speed.
    ///
    /// # Errors
    ///
    /// `InvalidPreference` if `new_freq <= 0`; nothing is written in that case.
    pub fn change_frequency<S: TaskStore + ?Sized>(
        &self,
        task: &mut S,
        prefs: &dyn ExtensionPrefs,
        new_freq: f64,
    ) -> Result<DateTime<Utc>> {
        if !(new_freq > 0.0) {
            return Err(CoreError::InvalidPreference(new_freq));
        }
        // The stored preference is being replaced, so it is not read.
        let state = MemorizationState::load_with_pref(task, new_freq)?;
        // Surface range errors before anything is written.
        self.due(state.reminder_num, new_freq)?;

        task.set_field(FREQUENCY_PREF, json!(new_freq))?;
        task.set_field(REPEAT_TRIGGER_COUNT, RepeatCount::NotStarted.into())?;
        debug!(frequency_pref = new_freq, "frequency preference changed");
        self.start(task, prefs)
    }

    /// The scheduler fired this task again without a response.
    ///
    /// Schedules a follow-up one day out and suspends the series once the
    /// same reminder has been sent more than [`MAX_REPEATS`] + 1 times.
    pub fn on_retrigger<S: TaskStore + ?Sized>(&self, task: &mut S) -> Result<RetriggerReport> {
        let count = match task.get_field(REPEAT_TRIGGER_COUNT) {
            None | Some(Value::Null) => RepeatCount::NotStarted,
            Some(value) => RepeatCount::try_from(value)?,
        }
        .next_count();
        let repeat_count = RepeatCount::Count(count);
        let trigger = self.clock.now() + follow_up_delay();
        let suspended = count > MAX_REPEATS;

        task.set_field(REPEAT_TRIGGER_COUNT, repeat_count.into())?;
        task.set_trigger_timestamp(trigger)?;
        task.mark_completed(suspended)?;

        if suspended {
            info!(repeat_count = count, "memorization suspended after unanswered reminders");
        } else {
            debug!(repeat_count = count, trigger = %trigger, "follow-up reminder scheduled");
        }
        Ok(RetriggerReport {
            repeat_count: count,
            trigger_time: trigger,
            suspended,
            notice: repeat_count.notice(),
        })
    }

    /// Current memorization details plus the two possible next due dates.
    pub fn info<S: TaskStore + ?Sized>(
        &self,
        task: &S,
        prefs: &dyn ExtensionPrefs,
    ) -> Result<MemInfo> {
        let state = self.load(task, prefs)?;
        Ok(MemInfo {
            reminder_num: state.reminder_num,
            frequency_pref: state.frequency_pref,
            repeat_count: state.repeat_count,
            phase: state.phase(),
            trigger_time: state.trigger_time,
            history_len: state.history.len(),
            if_remembered: self.due(state.reminder_num.saturating_add(1), state.frequency_pref)?,
            if_forgotten: self.due(state.reminder_num.saturating_sub(1), state.frequency_pref)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::storage::{ExtensionSettings, TaskRecord};

    fn config() -> MemorizeConfig {
        MemorizeConfig {
            decay_exponent: 2.5,
            default_frequency_pref: 8.0,
            ..Default::default()
        }
    }

    fn clock() -> ManualClock {
        ManualClock::at_unix(1_700_000_000)
    }

    fn reminder_num(task: &TaskRecord) -> Value {
        task.stored_data["reminder_num"].clone()
    }

    fn repeat(task: &TaskRecord) -> Value {
        task.stored_data["repeat_trigger_count"].clone()
    }

    #[test]
    fn start_initializes_new_task() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");

        let trigger = memorizer.start(&mut task, &()).unwrap();

        assert_eq!(trigger - clock.now(), Duration::days(8));
        assert_eq!(task.trigger_time, Some(trigger));
        assert_eq!(reminder_num(&task), json!(0));
        assert_eq!(task.stored_data["frequency_pref"], json!(8.0));
        assert_eq!(repeat(&task), json!("no_reminders"));
        assert!(!task.completed);
    }

    #[test]
    fn start_preserves_existing_progress() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        task.stored_data.insert("reminder_num".into(), json!(2));
        task.stored_data.insert("repeat_trigger_count".into(), json!(1));

        memorizer.start(&mut task, &()).unwrap();

        assert_eq!(reminder_num(&task), json!(2));
        assert_eq!(repeat(&task), json!("no_reminders"));
    }

    #[test]
    fn start_uses_extension_default() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let prefs = ExtensionSettings {
            default_frequency_pref: Some("3".into()),
            frequency_options: None,
        };
        let mut task = TaskRecord::new("memorize");

        let trigger = memorizer.start(&mut task, &prefs).unwrap();

        assert_eq!(task.stored_data["frequency_pref"], json!(3.0));
        assert_eq!(trigger - clock.now(), Duration::days(3));
    }

    #[test]
    fn remembered_advances_the_curve() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        let first = memorizer.start(&mut task, &()).unwrap();
        memorizer.on_retrigger(&mut task).unwrap();

        let report = memorizer
            .acknowledge(&mut task, &(), Outcome::Remembered)
            .unwrap();

        assert_eq!(report.reminder_num, 1);
        assert!(report.trigger_time > first);
        assert_eq!(task.trigger_time, Some(report.trigger_time));
        assert_eq!(report.history_len, 1);
        assert_eq!(repeat(&task), json!("no_reminders"));
        assert!(report.message.contains("incremented to 1"));
    }

    #[test]
    fn forgotten_steps_back_but_not_below_zero() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        task.stored_data.insert("reminder_num".into(), json!(1));

        let report = memorizer
            .acknowledge(&mut task, &(), Outcome::Forgotten)
            .unwrap();
        assert_eq!(report.reminder_num, 0);
        let report = memorizer
            .acknowledge(&mut task, &(), Outcome::Forgotten)
            .unwrap();
        assert_eq!(report.reminder_num, 0);
        assert_eq!(report.trigger_time - clock.now(), Duration::days(8));
        assert_eq!(report.history_len, 2);
    }

    #[test]
    fn acknowledge_keeps_history_capped() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        for _ in 0..505 {
            clock.advance(Duration::minutes(1));
            memorizer
                .acknowledge(&mut task, &(), Outcome::Forgotten)
                .unwrap();
        }
        let history = task.stored_data["history"].as_array().unwrap();
        assert_eq!(history.len(), 500);
        assert_eq!(
            history.last().unwrap()["at"],
            json!(clock.now().timestamp())
        );
    }

    #[test]
    fn acknowledge_appends_to_mixed_history() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        let mut stored: Vec<Value> = (0..10)
            .map(|i| json!({ "at": 1_600_000_000 + i, "outcome": "remembered" }))
            .collect();
        stored.push(json!({ "date": 1_650_000_000_000i64, "mem": "yes" }));
        task.stored_data.insert("history".into(), Value::Array(stored));

        let report = memorizer
            .acknowledge(&mut task, &(), Outcome::Remembered)
            .unwrap();

        assert_eq!(report.history_len, 12);
        let history = task.stored_data["history"].as_array().unwrap();
        assert_eq!(history[0]["at"], json!(1_600_000_000));
        assert_eq!(history[10]["at"], json!(1_650_000_000));
        assert_eq!(history[11]["at"], json!(clock.now().timestamp()));
    }

    #[test]
    fn retrigger_counts_from_whole_float() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        task.stored_data
            .insert("repeat_trigger_count".into(), json!(1.0));

        let report = memorizer.on_retrigger(&mut task).unwrap();

        assert_eq!(report.repeat_count, 2);
        assert_eq!(repeat(&task), json!(2));
        assert!(!report.suspended);
    }

    #[test]
    fn acknowledge_revives_suspended_task() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        memorizer.start(&mut task, &()).unwrap();
        for _ in 0..4 {
            memorizer.on_retrigger(&mut task).unwrap();
        }
        assert!(task.completed);

        memorizer
            .acknowledge(&mut task, &(), Outcome::Remembered)
            .unwrap();
        assert!(!task.completed);
        let state = MemorizationState::load(&task, 8.0).unwrap();
        assert_eq!(state.phase(), ReminderPhase::Scheduled);
    }

    #[test]
    fn retrigger_escalates_then_suspends() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        memorizer.start(&mut task, &()).unwrap();

        let reports: Vec<_> = (0..4)
            .map(|_| memorizer.on_retrigger(&mut task).unwrap())
            .collect();

        let counts: Vec<_> = reports.iter().map(|r| r.repeat_count).collect();
        let suspended: Vec<_> = reports.iter().map(|r| r.suspended).collect();
        assert_eq!(counts, vec![0, 1, 2, 3]);
        assert_eq!(suspended, vec![false, false, false, true]);
        assert!(task.completed);
        assert_eq!(repeat(&task), json!(3));
        assert_eq!(task.trigger_time, Some(clock.now() + Duration::days(1)));
        assert!(reports[3].notice.contains("paused"));
    }

    #[test]
    fn retrigger_rejects_corrupt_counter() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        task.stored_data
            .insert("repeat_trigger_count".into(), json!("twice"));
        let before = task.clone();

        assert!(matches!(
            memorizer.on_retrigger(&mut task),
            Err(CoreError::CorruptState { .. })
        ));
        assert_eq!(task, before);
    }

    #[test]
    fn change_frequency_reschedules_and_resets_repeats() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        task.stored_data.insert("reminder_num".into(), json!(2));
        task.stored_data.insert("repeat_trigger_count".into(), json!(2));

        let trigger = memorizer.change_frequency(&mut task, &(), 50.0).unwrap();

        assert_eq!(task.stored_data["frequency_pref"], json!(50.0));
        assert_eq!(reminder_num(&task), json!(2));
        assert_eq!(repeat(&task), json!("no_reminders"));
        assert_eq!(trigger, next_interval(2, 50.0, 2.5, clock.now()).unwrap());
    }

    #[test]
    fn invalid_frequency_leaves_task_unchanged() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        memorizer.start(&mut task, &()).unwrap();
        let before = task.clone();

        for bad in [0.0, -2.0, f64::NAN] {
            assert!(matches!(
                memorizer.change_frequency(&mut task, &(), bad),
                Err(CoreError::InvalidPreference(_))
            ));
        }
        assert_eq!(task, before);
    }

    #[test]
    fn change_frequency_replaces_unreadable_preference() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        task.stored_data.insert("reminder_num".into(), json!(1));
        task.stored_data
            .insert("frequency_pref".into(), json!({ "bad": true }));
        assert!(matches!(
            memorizer.start(&mut task, &()),
            Err(CoreError::CorruptState { .. })
        ));

        let trigger = memorizer.change_frequency(&mut task, &(), 3.0).unwrap();

        assert_eq!(task.stored_data["frequency_pref"], json!(3.0));
        assert_eq!(trigger, next_interval(1, 3.0, 2.5, clock.now()).unwrap());
    }

    #[test]
    fn info_reports_both_branches() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut task = TaskRecord::new("memorize");
        task.stored_data.insert("reminder_num".into(), json!(1));
        memorizer.start(&mut task, &()).unwrap();

        let info = memorizer.info(&task, &()).unwrap();
        assert_eq!(info.reminder_num, 1);
        assert_eq!(info.phase, ReminderPhase::Scheduled);
        assert_eq!(info.if_forgotten - clock.now(), Duration::days(8));
        assert!(info.if_remembered > info.trigger_time.unwrap());
    }

    struct ReadOnlyStore(TaskRecord);

    impl TaskStore for ReadOnlyStore {
        fn get_field(&self, key: &str) -> Option<Value> {
            self.0.get_field(key)
        }
        fn set_field(&mut self, key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::WriteRejected {
                key: key.to_string(),
                message: "read-only".into(),
            })
        }
        fn trigger_timestamp(&self) -> Option<DateTime<Utc>> {
            self.0.trigger_timestamp()
        }
        fn set_trigger_timestamp(&mut self, _at: DateTime<Utc>) -> Result<(), StoreError> {
            Ok(())
        }
        fn is_completed(&self) -> bool {
            self.0.is_completed()
        }
        fn mark_completed(&mut self, _completed: bool) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn store_errors_propagate() {
        let cfg = config();
        let clock = clock();
        let memorizer = Memorizer::new(&cfg, &clock);
        let mut store = ReadOnlyStore(TaskRecord::new("memorize"));
        assert!(matches!(
            memorizer.start(&mut store, &()),
            Err(CoreError::Store(StoreError::WriteRejected { .. }))
        ));
    }
}
