//! TOML-based application configuration.
//!
//! Stores the host context the session runner and CLI need:
//! - Tick interval and recording threshold
//! - Ambient audio preferences
//! - Trial / subscription flags
//! - User-defined breathing protocols
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::protocol::{BreathingProtocol, ProtocolCatalog};
use crate::session::RunnerOptions;

/// Session pacing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Manually ended sessions shorter than this are not recorded.
    #[serde(default = "default_min_record_secs")]
    pub min_record_secs: u32,
    #[serde(default = "default_protocol")]
    pub default_protocol: String,
}

/// Ambient audio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_50")]
    pub volume: u32,
}

/// Trial and subscription flags.
///
/// Kept here as plain data; nothing in the core enforces access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountFlags {
    #[serde(default)]
    pub subscribed: bool,
    #[serde(default)]
    pub trial_started_at: Option<DateTime<Utc>>,
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub account: AccountFlags,
    #[serde(default)]
    pub custom_protocols: Vec<BreathingProtocol>,
}

fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_min_record_secs() -> u32 {
    10
}
fn default_protocol() -> String {
    "box-breathing".into()
}
fn default_true() -> bool {
    true
}
fn default_50() -> u32 {
    50
}
fn default_trial_days() -> u32 {
    7
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            min_record_secs: default_min_record_secs(),
            default_protocol: default_protocol(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 50,
        }
    }
}

impl Default for AccountFlags {
    fn default() -> Self {
        Self {
            subscribed: false,
            trial_started_at: None,
            trial_days: default_trial_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            audio: AudioConfig::default(),
            account: AccountFlags::default(),
            custom_protocols: Vec::new(),
        }
    }
}

impl AccountFlags {
    pub fn trial_ends_at(&self) -> Option<DateTime<Utc>> {
        self.trial_started_at
            .map(|start| start + chrono::Duration::days(i64::from(self.trial_days)))
    }

    pub fn trial_active(&self, now: DateTime<Utc>) -> bool {
        self.trial_ends_at().is_some_and(|end| now < end)
    }

    pub fn has_premium_access(&self, now: DateTime<Utc>) -> bool {
        self.subscribed || self.trial_active(now)
    }

    /// Start the trial unless one was already started.
    /// Returns `false` if a trial already exists.
    pub fn start_trial(&mut self, now: DateTime<Utc>) -> bool {
        if self.trial_started_at.is_some() {
            return false;
        }
        self.trial_started_at = Some(now);
        true
    }
}

impl Config {
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
        if key.is_empty() {
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
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                serde_json::Value::Null if value == "null" || value.is_empty() => {
                    serde_json::Value::Null
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Self::from_toml(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or holds a value
    /// [`Config::validate`] rejects.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
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

    /// Update a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value has the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the runner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.audio.volume > 100 {
            return Err(ConfigError::InvalidValue {
                key: "audio.volume".into(),
                message: "must be between 0 and 100".into(),
            });
        }
        if let Some(err) = self.catalog().validate_all().into_iter().next() {
            return Err(ConfigError::InvalidValue {
                key: "custom_protocols".into(),
                message: err.to_string(),
            });
        }
        Ok(())
    }

    /// Built-in protocols plus the ones defined in this config.
    pub fn catalog(&self) -> ProtocolCatalog {
        ProtocolCatalog::with_custom(self.custom_protocols.clone())
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            tick_interval: Duration::from_millis(self.session.tick_interval_ms),
            min_record_secs: self.session.min_record_secs,
        }
    }
}
