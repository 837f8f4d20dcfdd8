//! Daemon configuration.
//!
//! A YAML file merged with `FAULTD_`-prefixed environment variables; every
//! field has a serde default so a missing file yields a runnable config.

use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Default config file location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/faultd.yaml";

/// Complete daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaultdConfig {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub ticketing: TicketingConfig,
}

/// Snapshot poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Seconds between full store snapshots
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Rule engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between autonomous rule evaluation passes
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Optional rule settings file; defaults apply when absent
    #[serde(default)]
    pub settings_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            settings_file: None,
        }
    }
}

/// Ticketing integration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketingConfig {
    /// Whether a ticketing integration should be active
    #[serde(default)]
    pub enabled: bool,
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl FaultdConfig {
    /// Load configuration from the default file location plus environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit file plus environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Figment::from(Serialized::defaults(FaultdConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("FAULTD_").split("__"))
            .extract()?;
        Ok(config)
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_tick_interval_secs() -> u64 {
    1
}
