//! TOML-based application configuration.
//!
//! Stores:
//! - Period lengths and tick rate
//! - Energy rates and the pass threshold
//! - Score awards and penalties
//! - Integrity detector thresholds
//! - The identity the CLI runs as
//!
//! Configuration is stored at `~/.config/studyroom/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::controller::SessionPolicy;
use crate::energy::EnergyPolicy;
use crate::error::ConfigError;
use crate::integrity::IntegrityPolicy;
use crate::session::TimingPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u32,
    #[serde(default = "default_work_period_secs")]
    pub work_period_secs: u64,
    #[serde(default = "default_break_secs")]
    pub break_secs: u64,
    /// Countdown tick interval. One tick is always one countdown second.
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConfig {
    #[serde(default = "default_tick_regen")]
    pub tick_regen: f64,
    #[serde(default = "default_offline_regen")]
    pub offline_regen: f64,
    #[serde(default = "default_cheat_penalty_rate")]
    pub cheat_penalty_rate: f64,
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_period_bonus")]
    pub period_bonus: u32,
    #[serde(default = "default_depletion_penalty")]
    pub depletion_penalty: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityConfig {
    #[serde(default = "default_min_hidden_secs")]
    pub min_hidden_secs: u64,
    #[serde(default = "default_max_frames_while_hidden")]
    pub max_frames_while_hidden: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studyroom/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub user: UserConfig,
}

// Default functions
fn default_period_minutes() -> u32 {
    30
}
fn default_work_period_secs() -> u64 {
    1800
}
fn default_break_secs() -> u64 {
    300
}
fn default_tick_millis() -> u64 {
    1000
}
fn default_tick_regen() -> f64 {
    0.3
}
fn default_offline_regen() -> f64 {
    0.1
}
fn default_cheat_penalty_rate() -> f64 {
    5.0
}
fn default_pass_threshold() -> f64 {
    50.0
}
fn default_period_bonus() -> u32 {
    10
}
fn default_depletion_penalty() -> u32 {
    5
}
fn default_min_hidden_secs() -> u64 {
    5
}
fn default_max_frames_while_hidden() -> u64 {
    15
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            period_minutes: default_period_minutes(),
            work_period_secs: default_work_period_secs(),
            break_secs: default_break_secs(),
            tick_millis: default_tick_millis(),
        }
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            tick_regen: default_tick_regen(),
            offline_regen: default_offline_regen(),
            cheat_penalty_rate: default_cheat_penalty_rate(),
            pass_threshold: default_pass_threshold(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            period_bonus: default_period_bonus(),
            depletion_penalty: default_depletion_penalty(),
        }
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            min_hidden_secs: default_min_hidden_secs(),
            max_frames_while_hidden: default_max_frames_while_hidden(),
        }
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
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(n) => {
                        if n.is_f64() {
                            let parsed = value
                                .parse::<f64>()
                                .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                            serde_json::Number::from_f64(parsed)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("'{value}' is not finite")))?
                        } else {
                            let parsed = value.parse::<u64>().map_err(|_| {
                                invalid(format!("cannot parse '{value}' as a whole number"))
                            })?;
                            serde_json::Value::Number(parsed.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk, writing the defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds out-of-range values, or if the default config cannot be written
    /// to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Parse and validate a config document.
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

    /// Set a config value by key without persisting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// as the key's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
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

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Reject values the session core cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                })
            }
        };
        positive("timing.period_minutes", self.timing.period_minutes > 0)?;
        positive("timing.work_period_secs", self.timing.work_period_secs > 0)?;
        positive("timing.break_secs", self.timing.break_secs > 0)?;
        positive("timing.tick_millis", self.timing.tick_millis > 0)?;
        for (key, rate) in [
            ("energy.tick_regen", self.energy.tick_regen),
            ("energy.offline_regen", self.energy.offline_regen),
            ("energy.cheat_penalty_rate", self.energy.cheat_penalty_rate),
            ("energy.pass_threshold", self.energy.pass_threshold),
        ] {
            if !(rate.is_finite() && rate >= 0.0) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be a non-negative number".into(),
                });
            }
        }
        Ok(())
    }

    /// Session rules built from this configuration.
    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            timing: TimingPolicy {
                period_minutes: self.timing.period_minutes,
                work_period_secs: self.timing.work_period_secs,
                break_secs: self.timing.break_secs,
            },
            energy: EnergyPolicy {
                tick_regen: self.energy.tick_regen,
                offline_regen: self.energy.offline_regen,
                cheat_penalty_rate: self.energy.cheat_penalty_rate,
                pass_threshold: self.energy.pass_threshold,
                period_bonus: self.scoring.period_bonus,
                depletion_penalty: self.scoring.depletion_penalty,
            },
            integrity: IntegrityPolicy {
                min_hidden_secs: self.integrity.min_hidden_secs,
                max_frames_while_hidden: self.integrity.max_frames_while_hidden,
            },
        }
    }
}
