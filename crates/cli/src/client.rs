//! Connection to the BoardPilot service for one boardctl invocation

use std::time::Duration;

use anyhow::Result;
use boardpilot_ipc::{Device, IpcError, RpcClient};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::CliError;

/// Registered client plus its event loop
pub struct BoardClient {
    rpc: RpcClient,
    event_loop: JoinHandle<()>,
}

impl BoardClient {
    /// Connect, register and fetch the device list
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let transport = config.transport_config();
        let rpc = RpcClient::new(config.client_config());

        let event_loop = rpc.connect(&transport).await.map_err(|e| {
            CliError::ServiceUnavailable(format!("{}: {e}", transport.socket_addr()))
        })?;

        let register_timeout = Duration::from_millis(config.service.request_timeout_ms);
        match rpc.wait_until_registered(register_timeout).await {
            Ok(()) => {}
            Err(IpcError::RegistrationRejected) => {
                return Err(CliError::ServiceUnavailable(
                    "service rejected the API key".to_string(),
                )
                .into());
            }
            Err(e) => return Err(CliError::ServiceUnavailable(e.to_string()).into()),
        }

        let devices = rpc.refresh_devices().await.map_err(CliError::from)?;
        info!(devices = devices.len(), "Connected to service");
        Ok(Self { rpc, event_loop })
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn devices(&self) -> Vec<Device> {
        self.rpc.registry().devices()
    }

    /// Pick the target device: explicit serial, then the configured
    /// default, then whatever the registry selected
    pub fn resolve_device(&self, explicit: Option<&str>, config: &AppConfig) -> Result<Device, CliError> {
        let registry = self.rpc.registry();
        let wanted = explicit.or(config.default_device.as_deref());

        if let Some(serial) = wanted {
            return registry
                .select_device(serial)
                .map_err(|_not_found| CliError::DeviceNotFound(serial.to_string()));
        }
        registry.selected_device().ok_or(CliError::NoDevice)
    }

    pub fn close(self) {
        debug!("Closing service connection");
        self.rpc.disconnect();
        self.event_loop.abort();
    }
}
