//! Application configuration

use anyhow::{anyhow, Result};
use helm_sens_core::{RefreshPolicyTable, DEFAULT_POLICIES};
use helm_sens_types::PolicySettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current config format version
pub const CONFIG_VERSION: u32 = 1;

/// Application-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: u32,
    /// Refresh policy per sensor; the key set is the sensor registry
    #[serde(default = "default_sensors")]
    pub sensors: BTreeMap<String, PolicySettings>,
    /// How often the console view refreshes, in milliseconds
    #[serde(default = "default_display_interval")]
    pub display_interval_ms: u64,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_sensors() -> BTreeMap<String, PolicySettings> {
    DEFAULT_POLICIES
        .iter()
        .map(|(sensor, policy)| (sensor.to_string(), PolicySettings::from(*policy)))
        .collect()
}

fn default_display_interval() -> u64 {
    1000
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if absent
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to_path(Self::config_path()?)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "github.helm_sens", "helm-sens")
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validated policy table for the configured sensors
    pub fn policy_table(&self) -> Result<RefreshPolicyTable> {
        let table = RefreshPolicyTable::new(
            self.sensors
                .iter()
                .map(|(sensor, settings)| (sensor.clone(), (*settings).into())),
        )?;
        Ok(table)
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms.max(50))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            sensors: default_sensors(),
            display_interval_ms: default_display_interval(),
        }
    }
}
