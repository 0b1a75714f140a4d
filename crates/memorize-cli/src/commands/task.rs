//! Task lifecycle commands operating on a JSON task record file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Subcommand;
use memorize_core::dispatch::DEFAULT_COMMAND_MATCH;
use memorize_core::{
    friendly_date, CoreError, Dispatch, Dispatcher, Memorizer, Outcome, StoreError, SystemClock,
    TaskEvent, TaskRecord,
};
use serde_json::json;

use super::{CommandResult, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Begin memorizing a task, creating the file if needed
    Start {
        /// Task record file
        file: PathBuf,
        /// Command recorded on a newly created task
        #[arg(long, default_value = DEFAULT_COMMAND_MATCH)]
        command: String,
    },
    /// Record whether the user remembered
    Ack {
        file: PathBuf,
        /// yes / no (or remembered / forgotten)
        answer: String,
    },
    /// Change the frequency preference and reschedule
    Freq {
        file: PathBuf,
        /// New frequency preference (> 0)
        pref: f64,
    },
    /// Handle an unanswered reminder firing again
    Trigger { file: PathBuf },
    /// Show memorization details
    Info {
        file: PathBuf,
        /// IANA timezone for dates (defaults to the configured timezone)
        #[arg(long)]
        tz: Option<String>,
    },
    /// Apply a host event given as JSON, skipping ids already processed
    Event {
        file: PathBuf,
        /// Event JSON, e.g. {"id":"1","event":"action","action":"mem.check.yes"}
        event: String,
        /// File holding processed event ids (JSON array)
        #[arg(long)]
        processed: Option<PathBuf>,
    },
}

fn load_or_create(path: &Path, command: &str) -> Result<TaskRecord, CoreError> {
    match TaskRecord::load_from(path) {
        Err(CoreError::Store(StoreError::NotFound(_))) => Ok(TaskRecord::new(command)),
        other => other,
    }
}

fn load_processed(path: Option<&Path>) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    match path {
        Some(path) if path.exists() => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        _ => Ok(Vec::new()),
    }
}

fn describe(at: DateTime<Utc>, tz: &str, now: DateTime<Utc>) -> String {
    let date = friendly_date(at, Some(tz), now);
    if date.relative.ends_with("ago") {
        format!("{} ({})", date.label, date.relative)
    } else {
        format!("{} (in {})", date.label, date.relative)
    }
}

pub fn run(ctx: &Context, action: TaskAction) -> CommandResult {
    let config = ctx.load_config()?;
    let memorizer = Memorizer::new(&config, SystemClock);
    let now = memorizer.now();
    let tz = config.default_timezone.as_str();

    match action {
        TaskAction::Start { file, command } => {
            let mut task = load_or_create(&file, &command)?;
            let trigger = memorizer.start(&mut task, &ctx.prefs)?;
            task.save_to(&file)?;
            if ctx.json {
                ctx.print_json(&json!({ "trigger_time": trigger }))?;
            } else {
                println!("Next reminder: {}", describe(trigger, tz, now));
            }
        }
        TaskAction::Ack { file, answer } => {
            let outcome: Outcome = answer.parse()?;
            let mut task = TaskRecord::load_from(&file)?;
            let report = memorizer.acknowledge(&mut task, &ctx.prefs, outcome)?;
            task.save_to(&file)?;
            if ctx.json {
                ctx.print_json(&report)?;
            } else {
                println!("{}", report.message);
            }
        }
        TaskAction::Freq { file, pref } => {
            let mut task = TaskRecord::load_from(&file)?;
            let trigger = memorizer.change_frequency(&mut task, &ctx.prefs, pref)?;
            task.save_to(&file)?;
            if ctx.json {
                ctx.print_json(&json!({ "frequency_pref": pref, "trigger_time": trigger }))?;
            } else {
                println!("Frequency set to {pref}. Next reminder: {}", describe(trigger, tz, now));
            }
        }
        TaskAction::Trigger { file } => {
            let mut task = TaskRecord::load_from(&file)?;
            let report = memorizer.on_retrigger(&mut task)?;
            task.save_to(&file)?;
            if ctx.json {
                ctx.print_json(&report)?;
            } else {
                if !report.notice.is_empty() {
                    println!("{}", report.notice);
                }
                if !report.suspended {
                    println!("Follow-up: {}", describe(report.trigger_time, tz, now));
                }
            }
        }
        TaskAction::Info { file, tz: tz_override } => {
            let task = TaskRecord::load_from(&file)?;
            let info = memorizer.info(&task, &ctx.prefs)?;
            if ctx.json {
                return ctx.print_json(&info);
            }
            let tz = tz_override.as_deref().unwrap_or(tz);
            println!("Reminder number: {}", info.reminder_num);
            println!("Frequency:       {}", info.frequency_pref);
            println!("Phase:           {:?}", info.phase);
            println!("Answers:         {}", info.history_len);
            match info.trigger_time {
                Some(at) => println!("Next reminder:   {}", describe(at, tz, now)),
                None => println!("Next reminder:   not scheduled"),
            }
            println!("If remembered:   {}", describe(info.if_remembered, tz, now));
            println!("If forgotten:    {}", describe(info.if_forgotten, tz, now));
        }
        TaskAction::Event {
            file,
            event,
            processed,
        } => {
            let event: TaskEvent = serde_json::from_str(&event)?;
            let mut task = load_or_create(&file, &event.command)?;
            let mut dispatcher =
                Dispatcher::new(memorizer).with_processed(load_processed(processed.as_deref())?);
            let dispatched = dispatcher.dispatch(&event, &mut task, &ctx.prefs)?;

            if !matches!(dispatched, Dispatch::Duplicate | Dispatch::Ignored) {
                task.save_to(&file)?;
            }
            if let Some(path) = processed {
                let ids: Vec<&str> = dispatcher.processed_ids().collect();
                std::fs::write(path, serde_json::to_string_pretty(&ids)?)?;
            }

            let label = match &dispatched {
                Dispatch::Started(_) => "started",
                Dispatch::Acknowledged(_) => "acknowledged",
                Dispatch::FrequencyChanged(_) => "frequency_changed",
                Dispatch::Retriggered(_) => "retriggered",
                Dispatch::Duplicate => "duplicate",
                Dispatch::Ignored => "ignored",
            };
            if ctx.json {
                ctx.print_json(&json!({ "event": event.id, "result": label }))?;
            } else {
                println!("{}: {label}", event.id);
            }
        }
    }
    Ok(())
}
