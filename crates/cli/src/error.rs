//! Error types for boardctl

use boardpilot_ipc::IpcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("No device connected")]
    NoDevice,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Device rejected the request: {0}")]
    DeviceRejected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Service error: {0}")]
    Ipc(#[from] IpcError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::DeviceNotFound(_) | CliError::NoDevice => 2,
            CliError::ValidationError(_)
            | CliError::InvalidConfiguration(_)
            | CliError::JsonError(_) => 4,
            CliError::ServiceUnavailable(_) => 5,
            CliError::DeviceRejected(_) => 6,
            CliError::Ipc(e) => match e {
                IpcError::DeviceNotFound { .. } | IpcError::NoDeviceSelected => 2,
                IpcError::Codec(_) | IpcError::InvalidConfig(_) => 4,
                IpcError::NotConnected
                | IpcError::ConnectionFailed(_)
                | IpcError::ConnectionLost
                | IpcError::Timeout { .. }
                | IpcError::RegistrationRejected => 5,
                IpcError::DeviceRejected { .. } => 6,
                _ => 1,
            },
            CliError::IoError(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardpilot_codec::{CodecError, ConfigField};

    #[test]
    fn exit_codes_follow_classification() {
        assert_eq!(CliError::NoDevice.exit_code(), 2);
        assert_eq!(CliError::ValidationError("x".into()).exit_code(), 4);
        assert_eq!(CliError::ServiceUnavailable("x".into()).exit_code(), 5);
        assert_eq!(
            CliError::from(IpcError::Codec(CodecError::OddHexLength { len: 3 })).exit_code(),
            4
        );
        assert_eq!(CliError::from(IpcError::timeout(100)).exit_code(), 5);
        assert_eq!(
            CliError::from(IpcError::DeviceRejected {
                field: ConfigField::Keymap
            })
            .exit_code(),
            6
        );
    }
}
