//! TOML-based application configuration.
//!
//! Stores:
//! - Gateway location and request timeout
//! - Game defaults (player name, rounds, time limit)
//! - Enabled question themes
//!
//! Configuration is stored at `~/.config/quizroom/config.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ValidationError};
use crate::session::{default_themes, SessionConfig, DEFAULT_TIME_LIMIT_SECS, DEFAULT_TOTAL_ROUNDS};

/// Returns `~/.config/quizroom[-dev]/` based on QUIZROOM_ENV.
///
/// Set QUIZROOM_ENV=dev to use the development config directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("QUIZROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("quizroom-dev")
    } else {
        base_dir.join("quizroom")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DirectoryUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Where the question, hint and stats endpoints live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Final results are POSTed here when set.
    #[serde(default)]
    pub report_url: Option<String>,
}

/// Defaults for new sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u32,
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/quizroom/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub game: GameConfig,
    /// Category -> enabled.
    #[serde(default = "default_themes")]
    pub themes: BTreeMap<String, bool>,
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_username() -> String {
    "player".into()
}
fn default_total_rounds() -> u32 {
    DEFAULT_TOTAL_ROUNDS
}
fn default_time_limit_secs() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            report_url: None,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            total_rounds: default_total_rounds(),
            time_limit_secs: default_time_limit_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            game: GameConfig::default(),
            themes: default_themes(),
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
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
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
                    serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
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

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
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

    /// Set a value by dot-separated key in memory. Call `save` to persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    pub fn gateway_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.gateway.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "gateway.base_url".into(),
            message: e.to_string(),
        })
    }

    pub fn report_url(&self) -> Result<Option<Url>, ConfigError> {
        self.gateway
            .report_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| {
                Url::parse(u).map_err(|e| ConfigError::InvalidValue {
                    key: "gateway.report_url".into(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.request_timeout_secs)
    }

    /// Validated session settings from the `game` and `themes` sections.
    pub fn session_config(&self) -> Result<SessionConfig, ValidationError> {
        let config = SessionConfig {
            username: self.game.username.clone(),
            total_rounds: self.game.total_rounds,
            time_limit_secs: self.game.time_limit_secs,
            themes: self.themes.clone(),
            seed: None,
        };
        config.validate()?;
        Ok(config)
    }
}
