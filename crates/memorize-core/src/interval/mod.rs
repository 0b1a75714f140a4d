mod calculator;
mod friendly;

pub use calculator::{delay_days, future_intervals, next_interval, FutureIntervals};
pub use friendly::{friendly_date, resolve_timezone, FriendlyDate};
