//! Plain-text previews of upcoming reminder schedules.
//!
//! Used by settings pages and reminder bodies to show what a frequency
//! option means in practice.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::interval::{friendly_date, future_intervals};
use crate::storage::{ExtensionPrefs, MemorizeConfig};

/// `"8 days, 45 days, 124 days, etc."`
pub fn interval_sentence(
    count: usize,
    frequency_pref: f64,
    decay_exponent: f64,
    starting_from: i64,
    now: DateTime<Utc>,
) -> Result<String> {
    let mut sentence = String::new();
    for due in future_intervals(count, frequency_pref, decay_exponent, starting_from, now)? {
        sentence.push_str(&friendly_date(due, None, now).relative);
        sentence.push_str(", ");
    }
    sentence.push_str("etc.");
    Ok(sentence)
}

/// One line per frequency option: `"**8** – 8 days, 45 days, ..."`.
pub fn option_schedules(
    config: &MemorizeConfig,
    prefs: &dyn ExtensionPrefs,
    count: usize,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let resolved = config.resolve(prefs);
    resolved
        .frequency_options
        .iter()
        .map(|option| -> Result<String> {
            let days = future_intervals(count, option, config.decay_exponent, 0, now)?
                .map(|due| friendly_date(due, None, now).relative)
                .collect::<Vec<_>>()
                .join(", ");
            Ok(format!("**{option}** – {days}"))
        })
        .collect()
}
