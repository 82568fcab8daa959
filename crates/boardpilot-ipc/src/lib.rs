//! Client side of the BoardPilot service protocol
//!
//! The BoardPilot service owns the USB and Bluetooth connections to hid:ergo
//! keyboards and exposes them over a local TCP socket. This crate speaks that
//! socket's JSON protocol and keeps track of the attached devices.
//!
//! # Architecture
//!
//! - [`protocol`]: request and reply envelopes, device descriptions
//! - [`codec`]: splitting the raw byte stream into JSON documents
//! - [`transport`]: transport abstraction, TCP implementation and a mock
//! - [`registry`]: known devices, current selection and update listeners
//! - [`client`]: request numbering, reply correlation and event dispatch
//! - [`device_config`]: typed reads and writes of keymaps, trackpad
//!   registers, sensitivities and the clock
//! - [`error`]: IPC-specific error types
//!
//! Payload encoding lives in `boardpilot-codec`.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use boardpilot_ipc::prelude::*;
//!
//! async fn show_sensitivity() -> IpcResult<u8> {
//!     let client = RpcClient::new(ClientConfig::default());
//!     let _events = client.connect(&TransportConfig::default()).await?;
//!     client.wait_until_registered(Duration::from_secs(5)).await?;
//!     let devices = client.refresh_devices().await?;
//!     let device = devices.first().ok_or(IpcError::NoDeviceSelected)?;
//!     client.read_sensitivity(device, ConfigField::MouseSensitivity).await
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod codec;
pub mod device_config;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use client::{ClientConfig, ConnectionState, PendingReply, RpcClient};
pub use codec::JsonFrameDecoder;
pub use error::{IpcError, IpcResult};
pub use protocol::{DeviceInfo, Request, Response};
pub use registry::{Device, DeviceRegistry, DeviceUpdate, ListenerId};
pub use transport::{TcpTransport, Transport, TransportBuilder, TransportConfig, TransportEvent};

/// Default service TCP port
pub const DEFAULT_SERVICE_PORT: u16 = 24429;

/// Default service host
pub const DEFAULT_SERVICE_ADDRESS: &str = "127.0.0.1";

/// Shared key the service expects in `REGISTER`
pub const DEFAULT_API_KEY: &str = "p*kG462jhJBY166EZLKxf9Du";
