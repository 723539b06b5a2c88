//! Configuration management.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// JSON state file.
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// Registry settings (SOA defaults, reserved counts, TTL bounds).
    #[serde(default)]
    pub registry_config: Option<PathBuf>,

    /// Default output format.
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "zonereg", "zonereg")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

impl CliConfig {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// State file used when nothing else names one.
    pub fn default_state_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().join("state.json"))
    }

    /// Registry settings file used when nothing else names one.
    pub fn default_registry_config() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("registry.toml"))
    }

    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Set one key from its command-line spelling.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "state_path" | "state" => self.state_path = Some(PathBuf::from(value)),
            "registry_config" => self.registry_config = Some(PathBuf::from(value)),
            "output_format" | "output" => self.output_format = Some(value.parse()?),
            _ => anyhow::bail!(
                "Unknown config key: {key}\n\n\
                 Available keys:\n  \
                 state_path       - JSON state file\n  \
                 registry_config  - Registry settings TOML\n  \
                 output_format    - Default output format (pretty/json/yaml)"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_set_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = CliConfig::default();
        config.set("state", "/var/lib/zonereg/state.json").unwrap();
        config.set("output", "yaml").unwrap();
        config.save_to(&path).unwrap();

        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded.state_path, Some(PathBuf::from("/var/lib/zonereg/state.json")));
        assert_eq!(loaded.output_format, Some(OutputFormat::Yaml));
    }

    #[test]
    fn test_unknown_key() {
        let mut config = CliConfig::default();
        assert!(config.set("api_key", "x").is_err());
        assert!(config.set("output", "csv").is_err());
    }
}
