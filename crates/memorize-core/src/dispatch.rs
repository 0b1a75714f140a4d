//! Routes host events to the reminder state machine.
//!
//! The state machine is not idempotent (every acknowledgment moves the
//! curve), so the dispatcher keeps an explicit set of processed event ids
//! and turns redeliveries into no-ops. The set is a bounded window: once it
//! holds [`DEFAULT_PROCESSED_CAP`] ids (or the configured cap), the oldest
//! id is forgotten for every new one.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::events::{EventKind, MemorizeAction, TaskEvent};
use crate::reminder::{AcknowledgeReport, Memorizer, RetriggerReport};
use crate::storage::{ExtensionPrefs, TaskStore};

/// Default substring identifying memorization tasks by their command.
pub const DEFAULT_COMMAND_MATCH: &str = "memorize";

/// Default number of processed event ids remembered.
pub const DEFAULT_PROCESSED_CAP: usize = 1000;

/// What a dispatched event did.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Started(DateTime<Utc>),
    Acknowledged(AcknowledgeReport),
    FrequencyChanged(DateTime<Utc>),
    Retriggered(RetriggerReport),
    /// Event id was already processed.
    Duplicate,
    /// Not a memorization event.
    Ignored,
}

pub struct Dispatcher<'a, C: Clock> {
    memorizer: Memorizer<'a, C>,
    command_match: String,
    processed: HashSet<String>,
    /// Insertion order of `processed`, oldest first.
    order: VecDeque<String>,
    cap: usize,
}

impl<'a, C: Clock> Dispatcher<'a, C> {
    pub fn new(memorizer: Memorizer<'a, C>) -> Self {
        Self::with_command_match(memorizer, DEFAULT_COMMAND_MATCH)
    }

    pub fn with_command_match(memorizer: Memorizer<'a, C>, command_match: &str) -> Self {
        Self {
            memorizer,
            command_match: command_match.to_string(),
            processed: HashSet::new(),
            order: VecDeque::new(),
            cap: DEFAULT_PROCESSED_CAP,
        }
    }

    /// Remember at most `cap` ids (at least one).
    pub fn with_processed_cap(mut self, cap: usize) -> Self {
        self.cap = cap.max(1);
        self.evict();
        self
    }

    /// Seed the processed set, oldest first, e.g. from ids persisted by the host.
    pub fn with_processed<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        for id in ids {
            self.record(id);
        }
        self
    }

    fn record(&mut self, id: String) {
        if self.processed.insert(id.clone()) {
            self.order.push_back(id);
            self.evict();
        }
    }

    fn evict(&mut self) {
        while self.order.len() > self.cap {
            if let Some(oldest) = self.order.pop_front() {
                self.processed.remove(&oldest);
            }
        }
    }

    pub fn memorizer(&self) -> &Memorizer<'a, C> {
        &self.memorizer
    }

    pub fn is_processed(&self, event_id: &str) -> bool {
        self.processed.contains(event_id)
    }

    /// Processed ids, oldest first.
    pub fn processed_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn matches_command(&self, command: &str) -> bool {
        command.contains(&self.command_match)
    }

    /// Apply one event to `task`.
    ///
    /// An event id is recorded only after its transition succeeded, so a
    /// failed event can be redelivered once the cause is fixed.
    pub fn dispatch<S: TaskStore + ?Sized>(
        &mut self,
        event: &TaskEvent,
        task: &mut S,
        prefs: &dyn ExtensionPrefs,
    ) -> Result<Dispatch> {
        if self.processed.contains(&event.id) {
            debug!(event_id = %event.id, "skipping already processed event");
            return Ok(Dispatch::Duplicate);
        }

        let dispatched = match &event.kind {
            EventKind::Created if self.matches_command(&event.command) => {
                Dispatch::Started(self.memorizer.start(task, prefs)?)
            }
            EventKind::Triggered if self.matches_command(&event.command) => {
                Dispatch::Retriggered(self.memorizer.on_retrigger(task)?)
            }
            EventKind::Action { action } => match MemorizeAction::parse(action)? {
                Some(MemorizeAction::Check(outcome)) => {
                    Dispatch::Acknowledged(self.memorizer.acknowledge(task, prefs, outcome)?)
                }
                Some(MemorizeAction::Frequency(pref)) => {
                    Dispatch::FrequencyChanged(self.memorizer.change_frequency(task, prefs, pref)?)
                }
                None => Dispatch::Ignored,
            },
            _ => Dispatch::Ignored,
        };

        if !matches!(dispatched, Dispatch::Ignored) {
            self.record(event.id.clone());
        }
        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CoreError;
    use crate::storage::{MemorizeConfig, TaskRecord};
    use serde_json::json;

    fn event(id: &str, kind: EventKind) -> TaskEvent {
        TaskEvent {
            id: id.into(),
            command: "memorize-spanish".into(),
            kind,
        }
    }

    fn action(id: &str, action: &str) -> TaskEvent {
        event(
            id,
            EventKind::Action {
                action: action.into(),
            },
        )
    }

    #[test]
    fn routes_lifecycle_events() {
        let cfg = MemorizeConfig::default();
        let clock = ManualClock::at_unix(1_700_000_000);
        let mut dispatcher = Dispatcher::new(Memorizer::new(&cfg, &clock));
        let mut task = TaskRecord::new("memorize-spanish");

        assert!(matches!(
            dispatcher.dispatch(&event("1", EventKind::Created), &mut task, &()).unwrap(),
            Dispatch::Started(_)
        ));
        assert!(matches!(
            dispatcher.dispatch(&event("2", EventKind::Triggered), &mut task, &()).unwrap(),
            Dispatch::Retriggered(RetriggerReport { repeat_count: 0, .. })
        ));
        assert!(matches!(
            dispatcher.dispatch(&action("3", "mem.check.yes"), &mut task, &()).unwrap(),
            Dispatch::Acknowledged(AcknowledgeReport { reminder_num: 1, .. })
        ));
        assert!(matches!(
            dispatcher.dispatch(&action("4", "mem.freq.2-5"), &mut task, &()).unwrap(),
            Dispatch::FrequencyChanged(_)
        ));
        assert_eq!(task.stored_data["frequency_pref"], json!(2.5));
    }

    #[test]
    fn redelivered_event_is_a_no_op() {
        let cfg = MemorizeConfig::default();
        let clock = ManualClock::at_unix(1_700_000_000);
        let mut dispatcher = Dispatcher::new(Memorizer::new(&cfg, &clock));
        let mut task = TaskRecord::new("memorize-spanish");
        let ack = action("ack-1", "mem.check.yes");

        dispatcher.dispatch(&ack, &mut task, &()).unwrap();
        assert_eq!(
            dispatcher.dispatch(&ack, &mut task, &()).unwrap(),
            Dispatch::Duplicate
        );
        assert_eq!(task.stored_data["reminder_num"], json!(1));
        assert!(dispatcher.is_processed("ack-1"));
    }

    #[test]
    fn seeded_ids_are_skipped() {
        let cfg = MemorizeConfig::default();
        let clock = ManualClock::at_unix(1_700_000_000);
        let mut dispatcher = Dispatcher::new(Memorizer::new(&cfg, &clock))
            .with_processed(vec!["old".to_string()]);
        let mut task = TaskRecord::new("memorize-spanish");
        assert_eq!(
            dispatcher
                .dispatch(&event("old", EventKind::Created), &mut task, &())
                .unwrap(),
            Dispatch::Duplicate
        );
        assert!(task.trigger_time.is_none());
    }

    #[test]
    fn processed_window_forgets_oldest_ids() {
        let cfg = MemorizeConfig::default();
        let clock = ManualClock::at_unix(1_700_000_000);
        let mut dispatcher = Dispatcher::new(Memorizer::new(&cfg, &clock))
            .with_processed(["a", "b", "c"].map(String::from))
            .with_processed_cap(3);
        let mut task = TaskRecord::new("memorize-spanish");

        dispatcher
            .dispatch(&event("d", EventKind::Created), &mut task, &())
            .unwrap();

        let ids: Vec<_> = dispatcher.processed_ids().collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
        assert!(!dispatcher.is_processed("a"));
        assert_eq!(
            dispatcher
                .dispatch(&event("b", EventKind::Created), &mut task, &())
                .unwrap(),
            Dispatch::Duplicate
        );
    }

    #[test]
    fn ignores_other_commands_and_actions() {
        let cfg = MemorizeConfig::default();
        let clock = ManualClock::at_unix(1_700_000_000);
        let mut dispatcher = Dispatcher::new(Memorizer::new(&cfg, &clock));
        let mut task = TaskRecord::new("remind-me");
        let created = TaskEvent {
            id: "1".into(),
            command: "remind-me".into(),
            kind: EventKind::Created,
        };

        assert_eq!(
            dispatcher.dispatch(&created, &mut task, &()).unwrap(),
            Dispatch::Ignored
        );
        assert_eq!(
            dispatcher
                .dispatch(&action("2", "todo.done"), &mut task, &())
                .unwrap(),
            Dispatch::Ignored
        );
        assert!(!dispatcher.is_processed("1"));
        assert!(task.stored_data.is_empty());
    }

    #[test]
    fn failed_event_is_not_recorded() {
        let cfg = MemorizeConfig::default();
        let clock = ManualClock::at_unix(1_700_000_000);
        let mut dispatcher = Dispatcher::new(Memorizer::new(&cfg, &clock));
        let mut task = TaskRecord::new("memorize-spanish");

        assert!(matches!(
            dispatcher.dispatch(&action("bad", "mem.check.maybe"), &mut task, &()),
            Err(CoreError::InvalidOutcome(_))
        ));
        assert!(!dispatcher.is_processed("bad"));
    }
}
