//! TOML-based memorization configuration.
//!
//! Holds the deployment-wide scheduling parameters:
//! - Decay exponent of the interval curve
//! - Default frequency preference for new memorizations
//! - Selectable frequency options ("often" to "seldom")
//! - Timezone used when none is known for the user
//!
//! Configuration is stored at `~/.config/memorize/config.toml`. It is loaded
//! once and then passed by reference into every core operation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::data_dir;
use crate::error::ConfigError;

/// Ordered, de-duplicated set of selectable frequency preferences.
///
/// Always non-empty, every value finite and positive, sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FrequencyOptions(Vec<f64>);

impl FrequencyOptions {
    pub fn new(values: Vec<f64>) -> Result<Self, ConfigError> {
        if values.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "frequency_options".into(),
                message: "at least one option is required".into(),
            });
        }
        if let Some(bad) = values.iter().find(|v| !is_positive(**v)) {
            return Err(ConfigError::InvalidValue {
                key: "frequency_options".into(),
                message: format!("{bad} is not a positive number"),
            });
        }
        let mut values = values;
        values.sort_by(f64::total_cmp);
        values.dedup();
        Ok(Self(values))
    }

    /// Parse a comma-separated list such as `"1, 2.5, 10"`.
    pub fn parse_csv(raw: &str) -> Result<Self, ConfigError> {
        let values = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                    key: "frequency_options".into(),
                    message: format!("cannot parse '{s}' as number"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(values)
    }

    /// Smallest multiplier: most frequent reminders.
    pub fn often(&self) -> f64 {
        self.0[0]
    }

    /// Largest multiplier: least frequent reminders.
    pub fn seldom(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    pub fn contains(&self, pref: f64) -> bool {
        self.0.iter().any(|v| *v == pref)
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<f64>> for FrequencyOptions {
    type Error = ConfigError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FrequencyOptions> for Vec<f64> {
    fn from(options: FrequencyOptions) -> Self {
        options.0
    }
}

impl Default for FrequencyOptions {
    fn default() -> Self {
        Self(vec![1.0, 2.0, 3.0, 10.0, 20.0, 50.0, 100.0, 150.0, 200.0, 500.0])
    }
}

/// Memorization configuration.
///
/// Serialized to/from TOML at `~/.config/memorize/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorizeConfig {
    /// Exponent applied to `reminder_num + 1`; larger values spread reminders faster.
    #[serde(default = "default_decay_exponent")]
    pub decay_exponent: f64,
    /// Frequency preference for tasks that have none stored.
    #[serde(default = "default_frequency_pref")]
    pub default_frequency_pref: f64,
    #[serde(default)]
    pub frequency_options: FrequencyOptions,
    /// IANA timezone used when the user has none.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

fn default_decay_exponent() -> f64 {
    2.5
}
fn default_frequency_pref() -> f64 {
    100.0
}
fn default_timezone() -> String {
    "GMT".into()
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl Default for MemorizeConfig {
    fn default() -> Self {
        Self {
            decay_exponent: default_decay_exponent(),
            default_frequency_pref: default_frequency_pref(),
            frequency_options: FrequencyOptions::default(),
            default_timezone: default_timezone(),
        }
    }
}

impl MemorizeConfig {
    /// Check every numeric parameter is finite and positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.decay_exponent) {
            return Err(ConfigError::InvalidValue {
                key: "decay_exponent".into(),
                message: format!("{} is not a positive number", self.decay_exponent),
            });
        }
        if !is_positive(self.default_frequency_pref) {
            return Err(ConfigError::InvalidValue {
                key: "default_frequency_pref".into(),
                message: format!("{} is not a positive number", self.default_frequency_pref),
            });
        }
        // Options are validated on construction; re-check in case of a struct literal.
        FrequencyOptions::new(self.frequency_options.0.clone())?;
        Ok(())
    }

    /// Resolve per-deployment overrides against this configuration.
    pub fn resolve(&self, prefs: &dyn ExtensionPrefs) -> ResolvedPrefs {
        let default_frequency_pref = match prefs.default_frequency_pref() {
            Some(pref) if is_positive(pref) => pref,
            Some(pref) => {
                warn!(pref, "ignoring non-positive default frequency override");
                self.default_frequency_pref
            }
            None => self.default_frequency_pref,
        };
        let frequency_options = prefs
            .frequency_options()
            .unwrap_or_else(|| self.frequency_options.clone());
        ResolvedPrefs {
            default_frequency_pref,
            frequency_options,
        }
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Number(_) => value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Array(_) => match serde_json::from_str(value) {
                    Ok(parsed) => parsed,
                    Err(_) => serde_json::to_value(Vec::<f64>::from(FrequencyOptions::parse_csv(
                        value,
                    )?))
                    .map_err(|e| invalid(e.to_string()))?,
                },
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location: `<data_dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, or write and return the default config if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or holds
    /// invalid values, or if the default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: MemorizeConfig = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The result must still validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the updated config is invalid. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: MemorizeConfig =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// Per-deployment preference overrides (the extension-level settings store).
pub trait ExtensionPrefs {
    fn default_frequency_pref(&self) -> Option<f64>;
    fn frequency_options(&self) -> Option<FrequencyOptions>;
}

/// Override value for frequency options as it may be stored by a settings page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionsSetting {
    List(Vec<f64>),
    Csv(String),
}

/// Serde-backed [`ExtensionPrefs`]; blank values defer to the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionSettings {
    #[serde(default, rename = "defaultFrequencyPref")]
    pub default_frequency_pref: Option<String>,
    #[serde(default, rename = "frequencyOptions")]
    pub frequency_options: Option<OptionsSetting>,
}

impl ExtensionPrefs for ExtensionSettings {
    fn default_frequency_pref(&self) -> Option<f64> {
        let raw = self.default_frequency_pref.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<f64>() {
            Ok(pref) => Some(pref),
            Err(_) => {
                warn!(raw, "default frequency override is not a number, using configured default");
                None
            }
        }
    }

    fn frequency_options(&self) -> Option<FrequencyOptions> {
        let parsed = match self.frequency_options.as_ref()? {
            OptionsSetting::Csv(raw) if raw.trim().is_empty() => return None,
            OptionsSetting::Csv(raw) => FrequencyOptions::parse_csv(raw),
            OptionsSetting::List(values) => FrequencyOptions::new(values.clone()),
        };
        match parsed {
            Ok(options) => Some(options),
            Err(e) => {
                warn!(error = %e, "unsupported frequency options override, using configured options");
                None
            }
        }
    }
}

/// Deployment has no overrides.
impl ExtensionPrefs for () {
    fn default_frequency_pref(&self) -> Option<f64> {
        None
    }
    fn frequency_options(&self) -> Option<FrequencyOptions> {
        None
    }
}

/// Effective preferences after applying overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPrefs {
    pub default_frequency_pref: f64,
    pub frequency_options: FrequencyOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = MemorizeConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: MemorizeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = MemorizeConfig::default();
        assert_eq!(cfg.decay_exponent, 2.5);
        assert_eq!(cfg.default_frequency_pref, 100.0);
        assert_eq!(cfg.frequency_options.len(), 10);
        assert_eq!(cfg.frequency_options.often(), 1.0);
        assert_eq!(cfg.frequency_options.seldom(), 500.0);
        assert_eq!(cfg.default_timezone, "GMT");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: MemorizeConfig = toml::from_str("decay_exponent = 2.0").unwrap();
        assert_eq!(cfg.decay_exponent, 2.0);
        assert_eq!(cfg.default_frequency_pref, 100.0);
    }

    #[test]
    fn frequency_options_are_sorted_and_deduplicated() {
        let options = FrequencyOptions::new(vec![50.0, 1.0, 8.0, 1.0]).unwrap();
        assert_eq!(options.iter().collect::<Vec<_>>(), vec![1.0, 8.0, 50.0]);
        assert!(options.contains(8.0));
        assert!(!options.contains(9.0));
    }

    #[test]
    fn frequency_options_reject_non_positive() {
        assert!(FrequencyOptions::new(vec![]).is_err());
        assert!(FrequencyOptions::new(vec![1.0, 0.0]).is_err());
        assert!(FrequencyOptions::new(vec![f64::NAN]).is_err());
        assert!(toml::from_str::<MemorizeConfig>("frequency_options = [-1.0]").is_err());
    }

    #[test]
    fn frequency_options_parse_csv() {
        let options = FrequencyOptions::parse_csv(" 3, 1.5,20 ").unwrap();
        assert_eq!(options.iter().collect::<Vec<_>>(), vec![1.5, 3.0, 20.0]);
        assert!(FrequencyOptions::parse_csv("1,often").is_err());
    }

    #[test]
    fn validate_rejects_bad_exponent() {
        let cfg = MemorizeConfig {
            decay_exponent: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "decay_exponent"
        ));
    }

    #[test]
    fn get_supports_keys() {
        let cfg = MemorizeConfig::default();
        assert_eq!(cfg.get("decay_exponent").as_deref(), Some("2.5"));
        assert_eq!(cfg.get("default_timezone").as_deref(), Some("GMT"));
        assert!(cfg.get("missing_key").is_none());
    }

    #[test]
    fn set_updates_number() {
        let mut cfg = MemorizeConfig::default();
        cfg.set("default_frequency_pref", "8").unwrap();
        assert_eq!(cfg.default_frequency_pref, 8.0);
    }

    #[test]
    fn set_accepts_csv_or_json_options() {
        let mut cfg = MemorizeConfig::default();
        cfg.set("frequency_options", "4,2,8").unwrap();
        assert_eq!(cfg.frequency_options.iter().collect::<Vec<_>>(), vec![2.0, 4.0, 8.0]);
        cfg.set("frequency_options", "[10, 5]").unwrap();
        assert_eq!(cfg.frequency_options.often(), 5.0);
    }

    #[test]
    fn set_rejects_unknown_key_and_invalid_values() {
        let mut cfg = MemorizeConfig::default();
        assert!(matches!(
            cfg.set("nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set("decay_exponent", "fast").is_err());
        assert!(cfg.set("decay_exponent", "-1").is_err());
        assert_eq!(cfg, MemorizeConfig::default());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = MemorizeConfig::load_from(&path).unwrap();
        assert_eq!(cfg, MemorizeConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = MemorizeConfig::default();
        cfg.set("default_frequency_pref", "8").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(MemorizeConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_frequency_pref = -4.0\n").unwrap();
        assert!(MemorizeConfig::load_from(&path).is_err());
    }

    #[test]
    fn resolve_prefers_extension_overrides() {
        let cfg = MemorizeConfig::default();
        let settings = ExtensionSettings {
            default_frequency_pref: Some("8".into()),
            frequency_options: Some(OptionsSetting::Csv("2,8,40".into())),
        };
        let resolved = cfg.resolve(&settings);
        assert_eq!(resolved.default_frequency_pref, 8.0);
        assert_eq!(resolved.frequency_options.seldom(), 40.0);
    }

    #[test]
    fn resolve_falls_back_on_blank_or_bad_overrides() {
        let cfg = MemorizeConfig::default();
        let settings = ExtensionSettings {
            default_frequency_pref: Some("  ".into()),
            frequency_options: Some(OptionsSetting::Csv("a,b".into())),
        };
        let resolved = cfg.resolve(&settings);
        assert_eq!(resolved.default_frequency_pref, 100.0);
        assert_eq!(resolved.frequency_options, cfg.frequency_options);

        let negative = ExtensionSettings {
            default_frequency_pref: Some("-3".into()),
            frequency_options: None,
        };
        assert_eq!(cfg.resolve(&negative).default_frequency_pref, 100.0);
        assert_eq!(cfg.resolve(&()).default_frequency_pref, 100.0);
    }

    #[test]
    fn extension_settings_accept_list_or_string() {
        let from_list: ExtensionSettings =
            serde_json::from_str(r#"{"frequencyOptions": [3, 1]}"#).unwrap();
        assert_eq!(from_list.frequency_options().unwrap().often(), 1.0);
        let from_csv: ExtensionSettings =
            serde_json::from_str(r#"{"frequencyOptions": "5,6"}"#).unwrap();
        assert_eq!(from_csv.frequency_options().unwrap().seldom(), 6.0);
    }
}
