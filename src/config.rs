//! Configuration loading and the reference deployment defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub service: ServiceConfig,
    pub sinks: SinkConfig,
    pub logging: LoggingConfig,
}

/// Datagram transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local address the telemetry socket binds.
    pub listen_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:12345".to_string(),
        }
    }
}

/// Publish-loop cadence and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Ticks per second for edge detection and sink publishing.
    pub tick_hz: u32,
    /// Seconds between statistics log lines, 0 to disable.
    pub stats_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            stats_interval_secs: 10,
        }
    }
}

/// Consumers the daemon registers at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Enable the console temperature display.
    pub display: bool,
    /// Door sinks to create, each receiving one pulse per tick.
    pub doors: Vec<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            display: true,
            doors: vec![
                "door1".to_string(),
                "door2".to_string(),
                "door3".to_string(),
            ],
        }
    }
}

/// Logging verbosity. `RUST_LOG` overrides the configured level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse {}: {}", path.as_ref().display(), e))
        })
    }

    /// Writes the configuration as TOML, useful for generating a template.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(&path, content).map_err(|e| {
            Error::Config(format!("failed to write {}: {}", path.as_ref().display(), e))
        })
    }
}
