//! Spaced-repetition interval curve.
//!
//! ```text
//! delay_days = (reminder_num + 1) ^ decay_exponent * frequency_pref
//! next_due   = now + delay_days * 86400s
//! ```
//!
//! Every remembered reminder moves one step further along the curve, every
//! forgotten one moves one step back.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

fn check_preference(frequency_pref: f64) -> Result<()> {
    // Also rejects NaN.
    if !(frequency_pref > 0.0) {
        return Err(CoreError::InvalidPreference(frequency_pref));
    }
    Ok(())
}

fn check_exponent(decay_exponent: f64) -> Result<()> {
    if !(decay_exponent.is_finite() && decay_exponent > 0.0) {
        return Err(CoreError::InvalidExponent(decay_exponent));
    }
    Ok(())
}

/// Delay in (fractional) days before reminder number `reminder_num` is due.
///
/// Negative counts are clamped to zero so they cannot invert the curve.
pub fn delay_days(reminder_num: i64, frequency_pref: f64, decay_exponent: f64) -> Result<f64> {
    check_preference(frequency_pref)?;
    check_exponent(decay_exponent)?;
    let step = reminder_num.max(0) as f64 + 1.0;
    Ok(step.powf(decay_exponent) * frequency_pref)
}

/// When the next reminder is due.
///
/// The delay is rounded up to whole seconds and is never shorter than one
/// second, so the result is always strictly after `now`.
///
/// # Errors
///
/// `InvalidPreference` if `frequency_pref <= 0`, `InvalidExponent` unless
/// `decay_exponent` is finite and positive, `IntervalOutOfRange` if the due
/// date cannot be represented.
pub fn next_interval(
    reminder_num: i64,
    frequency_pref: f64,
    decay_exponent: f64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let delay_days = delay_days(reminder_num, frequency_pref, decay_exponent)?;
    let delay_secs = (delay_days * SECONDS_PER_DAY).ceil().max(1.0);
    if !delay_secs.is_finite() || delay_secs >= i64::MAX as f64 {
        return Err(CoreError::IntervalOutOfRange { delay_days });
    }
    Duration::try_seconds(delay_secs as i64)
        .and_then(|delay| now.checked_add_signed(delay))
        .ok_or(CoreError::IntervalOutOfRange { delay_days })
}

/// The next `count` due dates starting at reminder number `starting_from`.
///
/// Both ends of the range are checked up front, so the returned iterator
/// yields exactly `count` items. It is `Clone`, so a preview can be replayed.
pub fn future_intervals(
    count: usize,
    frequency_pref: f64,
    decay_exponent: f64,
    starting_from: i64,
    now: DateTime<Utc>,
) -> Result<FutureIntervals> {
    check_preference(frequency_pref)?;
    check_exponent(decay_exponent)?;
    let end = starting_from.saturating_add(count as i64);
    if count > 0 {
        next_interval(starting_from, frequency_pref, decay_exponent, now)?;
        next_interval(end - 1, frequency_pref, decay_exponent, now)?;
    }
    Ok(FutureIntervals {
        frequency_pref,
        decay_exponent,
        now,
        next: starting_from,
        end,
    })
}

/// Lazy sequence returned by [`future_intervals`].
#[derive(Debug, Clone)]
pub struct FutureIntervals {
    frequency_pref: f64,
    decay_exponent: f64,
    now: DateTime<Utc>,
    next: i64,
    end: i64,
}

impl Iterator for FutureIntervals {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let reminder_num = self.next;
        self.next += 1;
        next_interval(reminder_num, self.frequency_pref, self.decay_exponent, self.now).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FutureIntervals {}
