//! Prelude module for convenient imports

pub use crate::client::{
    ClientConfig, ClientStatus, ConnectionState, PendingReply, ReadConfigReply, Registration,
    RpcClient, WriteConfigReply,
};
pub use crate::codec::JsonFrameDecoder;
pub use crate::error::{IpcError, IpcResult};
pub use crate::protocol::{
    Command, DeviceInfo, Event, EventType, Inbound, RawInbound, Request, Response,
    ResponseBody, TransportKind,
};
pub use crate::registry::{Device, DeviceRegistry, DeviceUpdate, ListenerId};
pub use crate::transport::{
    TcpTransport, Transport, TransportBuilder, TransportConfig, TransportEvent,
};
pub use crate::{DEFAULT_API_KEY, DEFAULT_SERVICE_ADDRESS, DEFAULT_SERVICE_PORT};
pub use boardpilot_codec::{ConfigField, DateTimeValue, FieldValue, KeyDef, TrackpadRegisters};
