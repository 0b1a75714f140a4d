use chrono::Utc;
use clap::Args;
use memorize_core::preview::option_schedules;

use super::{CommandResult, Context};

#[derive(Args)]
pub struct OptionsArgs {
    /// Number of intervals to show per option
    #[arg(long, default_value_t = 3)]
    count: usize,
}

pub fn run(ctx: &Context, args: OptionsArgs) -> CommandResult {
    let config = ctx.load_config()?;
    if ctx.json {
        let resolved = config.resolve(&ctx.prefs);
        return ctx.print_json(&resolved);
    }
    for line in option_schedules(&config, &ctx.prefs, args.count, Utc::now())? {
        println!("{line}");
    }
    Ok(())
}
