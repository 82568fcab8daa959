//! IPC-specific error types

use std::io;

use boardpilot_codec::{CodecError, ConfigField};
use thiserror::Error;

/// IPC error type
#[derive(Debug, Error)]
pub enum IpcError {
    /// No transport is attached or it has not reported open yet
    #[error("Not connected to the service")]
    NotConnected,

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport closed while the request was outstanding
    #[error("Connection lost before a reply arrived")]
    ConnectionLost,

    /// Timeout exceeded
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Message encoding failed
    #[error("Message encoding failed: {0}")]
    EncodingFailed(String),

    /// Message decoding failed
    #[error("Message decoding failed: {0}")]
    DecodingFailed(String),

    /// A reply arrived for a different command than the request
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// Command that was sent
        expected: String,
        /// Command in the reply
        actual: String,
    },

    /// The service refused the shared key
    #[error("Service rejected registration")]
    RegistrationRejected,

    /// A selected-device operation ran with nothing selected
    #[error("No device selected")]
    NoDeviceSelected,

    /// Serial is not in the device registry
    #[error("Device not found: {serial}")]
    DeviceNotFound {
        /// Serial that was looked up
        serial: String,
    },

    /// The device answered with `status: false`
    #[error("Device rejected {field}")]
    DeviceRejected {
        /// Field that was read or written
        field: ConfigField,
    },

    /// Payload codec failure
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IpcError {
    /// Check if this error is recoverable by retrying or reconnecting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IpcError::NotConnected
                | IpcError::ConnectionFailed(_)
                | IpcError::ConnectionLost
                | IpcError::Timeout { .. }
                | IpcError::DecodingFailed(_)
        )
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        IpcError::Timeout { timeout_ms }
    }

    /// Create a device-not-found error
    pub fn device_not_found(serial: impl Into<String>) -> Self {
        IpcError::DeviceNotFound {
            serial: serial.into(),
        }
    }
}

impl From<serde_json::Error> for IpcError {
    fn from(err: serde_json::Error) -> Self {
        IpcError::DecodingFailed(err.to_string())
    }
}

/// Specialized Result type for IPC operations
pub type IpcResult<T> = std::result::Result<T, IpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_recoverable() {
        assert!(IpcError::ConnectionLost.is_recoverable());
        assert!(IpcError::timeout(500).is_recoverable());
        assert!(!IpcError::NoDeviceSelected.is_recoverable());
        assert!(!IpcError::Codec(CodecError::OddHexLength { len: 1 }).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = IpcError::DeviceRejected {
            field: ConfigField::Keymap,
        };
        assert_eq!(err.to_string(), "Device rejected KEYMAP");

        let err = IpcError::device_not_found("ABC123");
        assert_eq!(err.to_string(), "Device not found: ABC123");
    }

    #[test]
    fn test_codec_error_converts() {
        let err: IpcError = CodecError::ReservedSlot { index: 2 }.into();
        assert!(matches!(err, IpcError::Codec(CodecError::ReservedSlot { index: 2 })));
    }
}
