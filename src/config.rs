use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::SessionConfig;
use crate::signal::Classification;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[session]` section, as written in the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub transport_target: String,
    pub baud_rate: Option<u32>,
    pub smoothing_window: usize,
    pub duration_cap_seconds: f64,
    pub classification: Classification,
    pub read_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub settle_delay_ms: Option<u64>,
    pub channel_names: Option<Vec<String>>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            transport_target: defaults.transport_target,
            baud_rate: defaults.baud_rate,
            smoothing_window: defaults.smoothing_window,
            duration_cap_seconds: defaults.duration_cap_seconds,
            classification: defaults.classification,
            read_timeout_ms: defaults.read_timeout.as_millis() as u64,
            connect_timeout_ms: defaults.connect_timeout.as_millis() as u64,
            settle_delay_ms: None,
            channel_names: None,
        }
    }
}

impl SessionSettings {
    /// Session configuration with a fresh session ID
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            transport_target: self.transport_target.clone(),
            baud_rate: self.baud_rate,
            smoothing_window: self.smoothing_window,
            duration_cap_seconds: self.duration_cap_seconds,
            classification: self.classification,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            settle_delay: self.settle_delay_ms.map(Duration::from_millis),
            ..SessionConfig::default()
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Load from `path` (extension optional). A missing file yields defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid config {}", path))
    }
}
