//! TOML configuration loader with validation.
//!
//! One file configures the whole safety loop: machine (axis labels, cycle
//! time), interlock thresholds, torque monitor parameters, and homing
//! dwells. Every section is optional and falls back to the documented
//! defaults. Validation runs before any component is created — an
//! unsupported homing variant or an out-of-bounds axis count is a startup
//! rejection, never a runtime condition.

use std::path::Path;

use serde::{Deserialize, Serialize};

use kestrel_common::config::MachineConfig;
use kestrel_common::homing::HomingConfig;
use kestrel_common::interlock::InterlockConfig;
use kestrel_common::torque::TorqueConfig;

/// Configuration loading/validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config validation: {0}")]
    Validation(String),
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KestrelConfig {
    #[serde(default)]
    pub machine: MachineConfig,
    #[serde(default)]
    pub interlock: InterlockConfig,
    #[serde(default)]
    pub torque: TorqueConfig,
    #[serde(default)]
    pub homing: HomingConfig,
}

impl KestrelConfig {
    /// Parse from TOML text without touching the filesystem.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Run every section's validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.machine
            .validate()
            .map_err(|e| ConfigError::Validation(format!("machine: {e}")))?;
        self.interlock
            .validate()
            .map_err(|e| ConfigError::Validation(format!("interlock: {e}")))?;
        self.torque
            .validate()
            .map_err(|e| ConfigError::Validation(format!("torque: {e}")))?;
        self.homing
            .validate()
            .map_err(|e| ConfigError::Validation(format!("homing: {e}")))?;
        Ok(())
    }
}

/// Load and validate the configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<KestrelConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    KestrelConfig::from_toml(&text)
}
