use clap::Subcommand;
use memorize_core::MemorizeConfig;

use super::{CommandResult, Context};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "decay_exponent", "default_timezone")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value; frequency_options takes a comma-separated list
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
}

pub fn run(ctx: &Context, action: ConfigAction) -> CommandResult {
    match action {
        ConfigAction::Get { key } => {
            let config = ctx.load_config()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = ctx.load_config()?;
            config.set(&key, &value)?;
            config.save_to(ctx.config_path())?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = ctx.load_config()?;
            ctx.print_json(&config)?;
        }
        ConfigAction::Reset => {
            MemorizeConfig::default().save_to(ctx.config_path())?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => println!("{}", ctx.config_path().display()),
    }
    Ok(())
}
