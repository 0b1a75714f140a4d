use chrono::Utc;
use clap::Args;
use memorize_core::preview::interval_sentence;
use memorize_core::{friendly_date, future_intervals};

use super::{CommandResult, Context};

#[derive(Args)]
pub struct PreviewArgs {
    /// Frequency preference (defaults to the configured default)
    #[arg(long)]
    pref: Option<f64>,
    /// Number of intervals to show
    #[arg(long, default_value_t = 3)]
    count: usize,
    /// Reminder number to start from
    #[arg(long, default_value_t = 0)]
    from: i64,
    /// IANA timezone for absolute dates (defaults to the configured timezone)
    #[arg(long)]
    tz: Option<String>,
}

pub fn run(ctx: &Context, args: PreviewArgs) -> CommandResult {
    let config = ctx.load_config()?;
    let pref = args
        .pref
        .unwrap_or_else(|| config.resolve(&ctx.prefs).default_frequency_pref);
    let now = Utc::now();

    if ctx.json {
        let tz = args.tz.as_deref().unwrap_or(&config.default_timezone);
        let dates: Vec<_> =
            future_intervals(args.count, pref, config.decay_exponent, args.from, now)?
                .map(|due| friendly_date(due, Some(tz), now))
                .collect();
        return ctx.print_json(&dates);
    }

    println!(
        "{}",
        interval_sentence(args.count, pref, config.decay_exponent, args.from, now)?
    );
    Ok(())
}
