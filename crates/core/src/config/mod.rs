//! Machine configuration loading, validation, and hot-reload.

mod environment;
mod watcher;

pub use environment::{ConfigLoader, EnvironmentProfile};
pub use watcher::ConfigWatcher;

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Machine-wide limits consumed by the safety envelope and sensor policy.
///
/// Loaded from a TOML file; `validate()` rejects out-of-range values rather
/// than clamping them silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Fraction of rated capacity, 0.0–1.0.
    #[serde(default = "default_max_load")]
    pub max_load: f64,

    #[serde(default = "default_max_runtime_seconds")]
    pub max_runtime_seconds: u64,

    #[serde(default = "default_sensor_threshold")]
    pub sensor_threshold: f64,

    #[serde(default = "default_max_temperature")]
    pub max_temperature: f64,

    #[serde(default = "default_heartbeat_timeout_seconds")]
    pub heartbeat_timeout_seconds: u64,
}

fn default_max_load() -> f64 {
    0.8
}
fn default_max_runtime_seconds() -> u64 {
    3600
}
fn default_sensor_threshold() -> f64 {
    75.0
}
fn default_max_temperature() -> f64 {
    90.0
}
fn default_heartbeat_timeout_seconds() -> u64 {
    30
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_load: default_max_load(),
            max_runtime_seconds: default_max_runtime_seconds(),
            sensor_threshold: default_sensor_threshold(),
            max_temperature: default_max_temperature(),
            heartbeat_timeout_seconds: default_heartbeat_timeout_seconds(),
        }
    }
}

impl MachineConfig {
    /// The platform-appropriate default config file location
    /// (`<config dir>/heating-machine/machine.toml`), used when no
    /// explicit path or `HEATING_MACHINE_CONFIG` override is given.
    pub fn default_path() -> Option<std::path::PathBuf> {
        directories::ProjectDirs::from("", "", "heating-machine")
            .map(|dirs| dirs.config_dir().join("machine.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.max_load) {
            return Err(ConfigError::Invalid(format!(
                "max_load must be within 0.0..=1.0, got {}",
                self.max_load
            )));
        }
        if self.max_runtime_seconds == 0 {
            return Err(ConfigError::Invalid(
                "max_runtime_seconds must be positive".to_string(),
            ));
        }
        if self.sensor_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "sensor_threshold must be positive".to_string(),
            ));
        }
        if self.max_temperature <= 0.0 {
            return Err(ConfigError::Invalid(
                "max_temperature must be positive".to_string(),
            ));
        }
        if self.heartbeat_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MachineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_max_load() {
        let mut config = MachineConfig::default();
        config.max_load = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_runtime() {
        let mut config = MachineConfig::default();
        config.max_runtime_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_parses_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine.toml");
        std::fs::write(&path, "max_load = 0.5\nmax_runtime_seconds = 120\n").unwrap();
        let config = MachineConfig::load(&path).unwrap();
        assert_eq!(config.max_load, 0.5);
        assert_eq!(config.max_runtime_seconds, 120);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.sensor_threshold, default_sensor_threshold());
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine.toml");
        std::fs::write(&path, "max_load = 2.0\n").unwrap();
        assert!(MachineConfig::load(&path).is_err());
    }
}
