use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "memorize", version, about = "Spaced-repetition reminder scheduler")]
struct Cli {
    /// Config file (defaults to ~/.config/memorize/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON file with extension settings (defaultFrequencyPref, frequencyOptions)
    #[arg(long, global = true, value_name = "PATH")]
    prefs: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a task record through the reminder lifecycle
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Show upcoming intervals for a frequency preference
    Preview(commands::preview::PreviewArgs),
    /// Show the schedule behind every frequency option
    Options(commands::options::OptionsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = commands::Context::new(cli.config, cli.prefs.as_deref(), cli.json).and_then(
        |ctx| match cli.command {
            Commands::Task { action } => commands::task::run(&ctx, action),
            Commands::Preview(args) => commands::preview::run(&ctx, args),
            Commands::Options(args) => commands::options::run(&ctx, args),
            Commands::Config { action } => commands::config::run(&ctx, action),
            Commands::Completions { shell } => {
                commands::completions::run(shell, &mut Cli::command())
            }
        },
    );

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
