//! Registry configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zonereg_core::{RegistryError, Result};

/// Configuration for a zonereg inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// JSON state file (default: none, in-memory only).
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// SOA timer defaults for new zones.
    #[serde(default)]
    pub soa: SoaDefaults,

    /// Network allocation policy.
    #[serde(default)]
    pub network: NetworkPolicy,

    /// Accepted TTL range for hosts, records and nameservers.
    #[serde(default)]
    pub ttl: TtlBounds,
}

/// SOA timer defaults, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaDefaults {
    #[serde(default = "default_refresh")]
    pub refresh: u32,
    #[serde(default = "default_retry")]
    pub retry: u32,
    #[serde(default = "default_expire")]
    pub expire: u32,
    #[serde(default = "default_soa_ttl")]
    pub ttl: u32,
}

/// Network allocation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    /// Reserved count for new networks (default: 3).
    #[serde(default = "default_reserved")]
    pub reserved: u32,

    /// Addresses considered by unused-address queries on families that are
    /// not enumerated in full (default: 4000).
    #[serde(default = "default_unused_cap")]
    pub unused_cap: u32,
}

/// Inclusive TTL bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlBounds {
    #[serde(default = "default_ttl_min")]
    pub min: u32,
    #[serde(default = "default_ttl_max")]
    pub max: u32,
}

impl Default for SoaDefaults {
    fn default() -> Self {
        Self {
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            ttl: default_soa_ttl(),
        }
    }
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            reserved: default_reserved(),
            unused_cap: default_unused_cap(),
        }
    }
}

impl Default for TtlBounds {
    fn default() -> Self {
        Self {
            min: default_ttl_min(),
            max: default_ttl_max(),
        }
    }
}

impl RegistryConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| RegistryError::Config(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.min > self.ttl.max {
            return Err(RegistryError::Config(format!(
                "ttl.min ({}) is greater than ttl.max ({})",
                self.ttl.min, self.ttl.max
            )));
        }
        if self.network.unused_cap == 0 {
            return Err(RegistryError::Config(
                "network.unused_cap must be positive".into(),
            ));
        }
        let soa = &self.soa;
        if [soa.refresh, soa.retry, soa.expire, soa.ttl].contains(&0) {
            return Err(RegistryError::Config("soa timers must be positive".into()));
        }
        Ok(())
    }
}

// Default value functions for serde.
const fn default_refresh() -> u32 {
    10_800
}

const fn default_retry() -> u32 {
    3_600
}

const fn default_expire() -> u32 {
    1_814_400
}

const fn default_soa_ttl() -> u32 {
    43_200
}

const fn default_reserved() -> u32 {
    3
}

const fn default_unused_cap() -> u32 {
    4_000
}

const fn default_ttl_min() -> u32 {
    300
}

const fn default_ttl_max() -> u32 {
    68_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.soa.refresh, 10_800);
        assert_eq!(config.soa.expire, 1_814_400);
        assert_eq!(config.network.reserved, 3);
        assert_eq!(config.network.unused_cap, 4_000);
        assert_eq!(config.ttl.min, 300);
        assert!(config.state_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: RegistryConfig = toml::from_str(
            r#"
            state_path = "/var/lib/zonereg/state.json"

            [network]
            unused_cap = 512
            "#,
        )
        .unwrap();
        assert_eq!(config.network.unused_cap, 512);
        assert_eq!(config.network.reserved, 3);
        assert_eq!(config.soa, SoaDefaults::default());
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let mut config = RegistryConfig::default();
        config.ttl.min = 90_000;
        assert!(config.validate().is_err());

        let mut config = RegistryConfig::default();
        config.network.unused_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RegistryConfig::default());
    }
}
