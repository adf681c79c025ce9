//! autoquery configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::debounce::DEFAULT_DEBOUNCE_DELAY;
use crate::refresh::DEFAULT_REFRESH_INTERVAL;

/// Coordinator defaults, loaded once and passed explicitly to each coordinator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Query execution defaults
    pub query: QueryConfig,

    /// Auto-refresh defaults
    pub refresh: RefreshConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.refresh.interval_secs == 0 {
            return Err(eyre::eyre!("refresh.interval-secs must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .autoquery.yml
        let local_config = PathBuf::from(".autoquery.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/autoquery/autoquery.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("autoquery").join("autoquery.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Query execution defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Delay before a debounced run executes
    #[serde(rename = "debounce-delay-ms")]
    pub debounce_delay_ms: u64,

    /// Abort the runner of a superseded query
    #[serde(rename = "abort-superseded")]
    pub abort_superseded: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            debounce_delay_ms: DEFAULT_DEBOUNCE_DELAY.as_millis() as u64,
            abort_superseded: true,
        }
    }
}

impl QueryConfig {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }
}

/// Auto-refresh defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Time between the end of one refresh and the start of the next
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,

    /// Whether auto-refresh starts enabled
    pub enabled: bool,

    /// Consecutive connection errors required before escalating
    #[serde(rename = "connection-error-threshold")]
    pub connection_error_threshold: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REFRESH_INTERVAL.as_secs(),
            enabled: true,
            connection_error_threshold: 2,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
