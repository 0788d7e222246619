//! Layered application configuration
//!
//! Built-in defaults, then an optional TOML file (`drive-monitor.toml`, or
//! the path in `DRIVE_MONITOR_CONFIG`), then `DRIVE_MONITOR__*` environment
//! variables, e.g. `DRIVE_MONITOR__SESSION__EMOTION_PERIOD_MS=3000`.

use alerting::AlertConfig;
use classifier::BackendConfig;
use config::{Config, ConfigError, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use session::SessionConfig;
use std::path::PathBuf;

pub const CONFIG_PATH_ENV: &str = "DRIVE_MONITOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "drive-monitor.toml";
const ENV_PREFIX: &str = "DRIVE_MONITOR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Named debouncer presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DmsPreset {
    Strict,
    Lenient,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub dms: DmsConfig,
    /// Replaces the `dms` section when set
    pub dms_preset: Option<DmsPreset>,
    pub alerts: AlertConfig,
}

impl AppConfig {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(path)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn dms_config(&self) -> DmsConfig {
        match self.dms_preset {
            Some(DmsPreset::Strict) => DmsConfig::strict(),
            Some(DmsPreset::Lenient) => DmsConfig::lenient(),
            None => self.dms.clone(),
        }
    }
}
