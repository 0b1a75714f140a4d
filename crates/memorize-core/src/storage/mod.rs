mod config;
pub mod task;

pub use config::{
    ExtensionPrefs, ExtensionSettings, FrequencyOptions, MemorizeConfig, OptionsSetting,
    ResolvedPrefs,
};
pub use task::{TaskRecord, TaskStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/memorize[-dev]/` based on MEMORIZE_ENV.
///
/// Set MEMORIZE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MEMORIZE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("memorize-dev")
    } else {
        base_dir.join("memorize")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
