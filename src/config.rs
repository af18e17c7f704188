use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::chat_db::DEFAULT_DATABASE_PATH;
use crate::storage::ensure_parent_dir;

pub const DEFAULT_CONFIG_PATH: &str = "config/server.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: String,
    /// Participants silent for at least this long are evicted.
    pub inactivity_threshold_secs: u64,
    pub sweep_period_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            inactivity_threshold_secs: 10,
            sweep_period_secs: 15,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("inactivity_threshold_secs must be greater than zero")]
    ZeroThreshold,
    #[error("sweep_period_secs must be greater than zero")]
    ZeroPeriod,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inactivity_threshold_secs == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.sweep_period_secs == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }

    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_secs(self.inactivity_threshold_secs)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_period_secs)
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    ensure_parent_dir(Path::new(path))?;
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}
