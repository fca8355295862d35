// Configuration loader

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "config/ceci.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CeciConfig {
    pub log_level: String,
    /// Moves allowed while returning to the initial screen.
    pub navigation_attempts: usize,
    /// Enter presses allowed while the command screen is still echoing.
    pub command_poll_attempts: usize,
    pub command_poll_delay_ms: u64,
}

impl Default for CeciConfig {
    fn default() -> Self {
        CeciConfig {
            log_level: "info".to_string(),
            navigation_attempts: 3,
            command_poll_attempts: 3,
            command_poll_delay_ms: 0,
        }
    }
}

impl CeciConfig {
    pub fn from_default() -> Result<Self, ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    /// Layers `CECI_*` environment variables over an optional TOML file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        debug!(path, "loading CECI configuration");
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("CECI"))
            .build()?
            .try_deserialize()
    }

    pub fn command_poll_delay(&self) -> Duration {
        Duration::from_millis(self.command_poll_delay_ms)
    }
}
