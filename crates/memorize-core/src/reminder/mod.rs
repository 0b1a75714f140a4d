mod machine;
mod state;

pub use machine::{
    follow_up_delay, AcknowledgeReport, MemInfo, Memorizer, RetriggerReport, MAX_REPEATS,
};
pub use state::{
    History, HistoryEntry, MemorizationState, Outcome, ReminderPhase, RepeatCount, HISTORY_CAP,
};
