//! CLI configuration management.
//!
//! Handles the hash algorithm, logging and default artifact location.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use whitelist_crypto::HashAlgorithm;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Hash used for leaves and nodes
    pub algorithm: HashAlgorithm,
    /// Tracing filter, e.g. "info" or "whitelist_crypto=debug"
    pub log_level: String,
    /// Emit logs as JSON
    pub json_logs: bool,
    /// Where `build` writes the artifact when no --output is given
    pub artifact_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Keccak256,
            log_level: "warn".to_string(),
            json_logs: false,
            artifact_path: PathBuf::from("whitelist.json"),
        }
    }
}

impl CliConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        // Create directory if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get configuration file path.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".whitelist").join("config.toml"))
    }
}
