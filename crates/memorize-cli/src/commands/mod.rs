use std::path::{Path, PathBuf};

use memorize_core::{ExtensionSettings, MemorizeConfig};
use tracing::debug;

pub mod completions;
pub mod config;
pub mod options;
pub mod preview;
pub mod task;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Options shared by every subcommand.
pub struct Context {
    config_path: PathBuf,
    pub prefs: ExtensionSettings,
    pub json: bool,
}

impl Context {
    pub fn new(
        config_path: Option<PathBuf>,
        prefs_path: Option<&Path>,
        json: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = match config_path {
            Some(path) => path,
            None => MemorizeConfig::path()?,
        };
        debug!(path = %config_path.display(), "using config file");
        let prefs = match prefs_path {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => ExtensionSettings::default(),
        };
        Ok(Self {
            config_path,
            prefs,
            json,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load_config(&self) -> Result<MemorizeConfig, Box<dyn std::error::Error>> {
        Ok(MemorizeConfig::load_from(&self.config_path)?)
    }

    /// Print `value` as pretty JSON.
    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> CommandResult {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
