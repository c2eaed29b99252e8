use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Five days, the window after which tracked keys are assumed cold.
const DEFAULT_TTL_SECS: u64 = 432_000;

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_update_threshold_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_sweep_page_size() -> usize {
    100
}

fn default_sweep_page_limit() -> usize {
    100
}

/// Application configuration loaded from the YAML config file.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Expiration window applied to every registered key at flush time.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Subjects modified longer ago than this skip the update-triggered purge.
    #[serde(default = "default_update_threshold_secs")]
    pub update_threshold_secs: u64,
    #[serde(default = "default_sweep_page_size")]
    pub sweep_page_size: usize,
    #[serde(default = "default_sweep_page_limit")]
    pub sweep_page_limit: usize,
    #[serde(default)]
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            default_ttl_secs: default_ttl_secs(),
            update_threshold_secs: default_update_threshold_secs(),
            sweep_page_size: default_sweep_page_size(),
            sweep_page_limit: default_sweep_page_limit(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "cache-collector", "cache-collector")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "cache-collector", "cache-collector")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

/// Knobs consumed by collectors and the sweeper, built once at startup
/// and passed by value instead of living in shared mutable state.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub default_ttl: Duration,
    pub update_threshold: Duration,
    pub sweep_page_size: usize,
    pub sweep_page_limit: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            default_ttl: Duration::from_secs(default_ttl_secs()),
            update_threshold: Duration::from_secs(default_update_threshold_secs()),
            sweep_page_size: default_sweep_page_size(),
            sweep_page_limit: default_sweep_page_limit(),
        }
    }
}

impl From<&AppConfig> for CollectorConfig {
    fn from(config: &AppConfig) -> Self {
        CollectorConfig {
            default_ttl: Duration::from_secs(config.default_ttl_secs),
            update_threshold: Duration::from_secs(config.update_threshold_secs),
            sweep_page_size: config.sweep_page_size,
            sweep_page_limit: config.sweep_page_limit,
        }
    }
}
