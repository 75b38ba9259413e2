use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;

/// A named canary rollout profile: heat bounds, step count, and the health
/// thresholds and pre-flight checks that gate each step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvironmentProfile {
    #[serde(skip)]
    pub name: String,
    pub min_heat: i64,
    pub max_heat: i64,
    #[serde(default)]
    pub canary_steps: i64,
    #[serde(default)]
    pub health_thresholds: HashMap<String, f64>,
    #[serde(default)]
    pub validation_checks: Vec<String>,
}

impl EnvironmentProfile {
    /// `max(1, (max_heat - min_heat) / canary_steps)` when `canary_steps >
    /// 0`, else `0`.
    pub fn increment(&self) -> i64 {
        if self.canary_steps <= 0 {
            return 0;
        }
        std::cmp::max(1, (self.max_heat - self.min_heat) / self.canary_steps)
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawEnvironments(#[serde(flatten)] HashMap<String, EnvironmentProfile>);

/// Reads a TOML environment map into named [`EnvironmentProfile`]s.
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// The platform-appropriate default environments file location
    /// (`<config dir>/heating-machine/environments.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "heating-machine")
            .map(|dirs| dirs.config_dir().join("environments.toml"))
    }

    pub fn load(&self, environment: &str) -> Result<EnvironmentProfile, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::Invalid(format!(
                "config file {} missing",
                self.config_path.display()
            )));
        }

        let content =
            std::fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Io {
                path: self.config_path.display().to_string(),
                source,
            })?;
        let raw: RawEnvironments = toml::from_str(&content)?;

        let mut profile = raw.0.get(environment).cloned().ok_or_else(|| {
            let mut available: Vec<&str> = raw.0.keys().map(String::as_str).collect();
            available.sort_unstable();
            ConfigError::Invalid(format!(
                "environment '{}' not found. Available: {}",
                environment,
                available.join(", ")
            ))
        })?;
        profile.name = environment.to_string();
        Ok(profile)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_environments(dir: &Path) -> PathBuf {
        let path = dir.join("environments.toml");
        std::fs::write(
            &path,
            r#"
[staging]
min_heat = 0
max_heat = 100
canary_steps = 4
validation_checks = ["ensure_monitoring"]

[staging.health_thresholds]
error_rate = 0.02
"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn loads_named_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_environments(dir.path());
        let loader = ConfigLoader::new(path);
        let profile = loader.load("staging").unwrap();
        assert_eq!(profile.name, "staging");
        assert_eq!(profile.increment(), 25);
        assert_eq!(profile.health_thresholds.get("error_rate"), Some(&0.02));
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_environments(dir.path());
        let loader = ConfigLoader::new(path);
        assert!(loader.load("production").is_err());
    }

    #[test]
    fn increment_is_zero_without_canary_steps() {
        let profile = EnvironmentProfile {
            name: "x".to_string(),
            min_heat: 0,
            max_heat: 100,
            canary_steps: 0,
            health_thresholds: HashMap::new(),
            validation_checks: Vec::new(),
        };
        assert_eq!(profile.increment(), 0);
    }
}
