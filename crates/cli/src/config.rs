//! Persistent boardctl settings
//!
//! Stored as JSON under the user config directory, e.g.
//! `~/.config/boardpilot/boardctl.json` on Linux.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use boardpilot_ipc::{
    ClientConfig, DEFAULT_API_KEY, DEFAULT_SERVICE_ADDRESS, DEFAULT_SERVICE_PORT, TransportBuilder,
    TransportConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CliError;

pub const CONFIG_SCHEMA: &str = "boardpilot.config/1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration schema version
    pub schema_version: String,
    #[serde(default)]
    pub service: ServiceSettings,
    /// Serial used when a command names no device
    #[serde(default)]
    pub default_device: Option<String>,
}

/// How to reach the BoardPilot service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub address: String,
    pub port: u16,
    pub api_key: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_SERVICE_ADDRESS.to_string(),
            port: DEFAULT_SERVICE_PORT,
            api_key: DEFAULT_API_KEY.to_string(),
            connect_timeout_ms: 3000,
            request_timeout_ms: 5000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA.to_string(),
            service: ServiceSettings::default(),
            default_device: None,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or return defaults if the file does not exist
    pub async fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(CliError::from)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;

        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub async fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| CliError::InvalidConfiguration("no user config directory".into()))?;
        Ok(base.join("boardpilot").join("boardctl.json"))
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if self.schema_version != CONFIG_SCHEMA {
            return Err(CliError::InvalidConfiguration(format!(
                "unsupported schema version: {}",
                self.schema_version
            )));
        }
        if self.service.address.trim().is_empty() {
            return Err(CliError::InvalidConfiguration(
                "service address is empty".into(),
            ));
        }
        if self.service.port == 0 {
            return Err(CliError::InvalidConfiguration("service port is 0".into()));
        }
        if self.service.api_key.is_empty() {
            return Err(CliError::InvalidConfiguration("api key is empty".into()));
        }
        if self.service.connect_timeout_ms == 0 || self.service.request_timeout_ms == 0 {
            return Err(CliError::InvalidConfiguration(
                "timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportBuilder::new()
            .address(self.service.address.clone())
            .port(self.service.port)
            .connect_timeout(Duration::from_millis(self.service.connect_timeout_ms))
            .build()
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .api_key(self.service.api_key.clone())
            .request_timeout(Duration::from_millis(self.service.request_timeout_ms))
            .auto_fetch_devices(false)
    }
}
