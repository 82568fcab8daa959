//! Service wire protocol
//!
//! Every message is a JSON object carrying a numeric `cmd`. Requests carry a
//! client-assigned `reqid` which the service echoes back in the reply along
//! with a `status` flag. `EVENT` messages are unsolicited and carry no
//! `reqid`.
//!
//! Config payloads travel hex encoded under the `data` key.

use std::fmt;

use boardpilot_codec::{ConfigField, bytes_to_hex, hex_to_bytes};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{IpcError, IpcResult};

/// Command ids
pub mod commands {
    pub const REGISTER: u64 = 0x01;
    pub const DEVICES: u64 = 0x10;
    pub const ZMK_CONTROL_WRITE: u64 = 0x40;
    pub const ZMK_CONTROL_READ: u64 = 0x41;
    pub const EVENT: u64 = 0x80;
}

/// Service command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Register,
    Devices,
    ZmkControlWrite,
    ZmkControlRead,
    Event,
    /// A command id this client does not know
    Unrecognized(u64),
}

impl Command {
    pub fn from_code(code: u64) -> Self {
        match code {
            commands::REGISTER => Command::Register,
            commands::DEVICES => Command::Devices,
            commands::ZMK_CONTROL_WRITE => Command::ZmkControlWrite,
            commands::ZMK_CONTROL_READ => Command::ZmkControlRead,
            commands::EVENT => Command::Event,
            other => Command::Unrecognized(other),
        }
    }

    pub fn code(self) -> u64 {
        match self {
            Command::Register => commands::REGISTER,
            Command::Devices => commands::DEVICES,
            Command::ZmkControlWrite => commands::ZMK_CONTROL_WRITE,
            Command::ZmkControlRead => commands::ZMK_CONTROL_READ,
            Command::Event => commands::EVENT,
            Command::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Register => write!(f, "REGISTER"),
            Command::Devices => write!(f, "DEVICES"),
            Command::ZmkControlWrite => write!(f, "ZMK_CONTROL_WRITE"),
            Command::ZmkControlRead => write!(f, "ZMK_CONTROL_READ"),
            Command::Event => write!(f, "EVENT"),
            Command::Unrecognized(code) => write!(f, "UNRECOGNIZED({code:#04x})"),
        }
    }
}

/// Unsolicited event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    None,
    DeviceConnected,
    DeviceDisconnected,
    Unrecognized(u64),
}

impl EventType {
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => EventType::None,
            1 => EventType::DeviceConnected,
            2 => EventType::DeviceDisconnected,
            other => EventType::Unrecognized(other),
        }
    }

    pub fn code(self) -> u64 {
        match self {
            EventType::None => 0,
            EventType::DeviceConnected => 1,
            EventType::DeviceDisconnected => 2,
            EventType::Unrecognized(code) => code,
        }
    }
}

/// How the keyboard is attached to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Usb,
    Bt,
    /// A transport this client does not know
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Usb => write!(f, "usb"),
            TransportKind::Bt => write!(f, "bt"),
            TransportKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// USB product descriptor fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub vid: u16,
    pub pid: u16,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub rev: u16,
}

/// Per-unit identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub serial: String,
    pub protocol: TransportKind,
}

/// Device description as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub product: ProductInfo,
    pub device: ConnectionInfo,
}

impl DeviceInfo {
    /// USB-attached device with the given serial and product name
    pub fn usb(serial: impl Into<String>, vid: u16, pid: u16, product: impl Into<String>) -> Self {
        Self {
            product: ProductInfo {
                vid,
                pid,
                manufacturer: String::new(),
                product: product.into(),
                rev: 0,
            },
            device: ConnectionInfo {
                serial: serial.into(),
                protocol: TransportKind::Usb,
            },
        }
    }

    pub fn serial(&self) -> &str {
        &self.device.serial
    }
}

/// Outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Authenticate with the shared key
    Register { key: String },
    /// List attached devices
    Devices,
    /// Read one config field from a device
    ReadConfig { device: String, field: ConfigField },
    /// Write one config field, optionally persisting it
    WriteConfig {
        device: String,
        field: ConfigField,
        data: Vec<u8>,
        save: bool,
    },
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Request::Register { .. } => Command::Register,
            Request::Devices => Command::Devices,
            Request::ReadConfig { .. } => Command::ZmkControlRead,
            Request::WriteConfig { .. } => Command::ZmkControlWrite,
        }
    }

    /// Build the JSON envelope for this request
    pub fn to_value(&self, reqid: u64) -> Value {
        let cmd = self.command().code();
        match self {
            Request::Register { key } => json!({ "cmd": cmd, "reqid": reqid, "key": key }),
            Request::Devices => json!({ "cmd": cmd, "reqid": reqid }),
            Request::ReadConfig { device, field } => json!({
                "cmd": cmd,
                "reqid": reqid,
                "device": device,
                "field": field.id(),
            }),
            Request::WriteConfig {
                device,
                field,
                data,
                save,
            } => json!({
                "cmd": cmd,
                "reqid": reqid,
                "device": device,
                "field": field.id(),
                "save": save,
                "data": bytes_to_hex(data),
            }),
        }
    }

    /// Serialize the envelope to the text sent over the transport
    pub fn encode(&self, reqid: u64) -> IpcResult<String> {
        serde_json::to_string(&self.to_value(reqid))
            .map_err(|e| IpcError::EncodingFailed(e.to_string()))
    }
}

/// Command-specific part of a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Register,
    Devices(Vec<DeviceInfo>),
    Read {
        device: String,
        field: ConfigField,
        data: Vec<u8>,
    },
    Write {
        device: String,
        field: ConfigField,
    },
    /// Reply to a command this client does not model
    Other(Map<String, Value>),
}

/// Reply envelope correlated by `reqid`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub command: Command,
    pub reqid: u64,
    pub status: bool,
    pub body: ResponseBody,
}

/// Unsolicited event envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    pub device: Option<DeviceInfo>,
}

/// Any message received from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Response(Response),
    Event(Event),
}

#[derive(Deserialize)]
struct Envelope {
    cmd: u64,
    #[serde(default)]
    reqid: Option<u64>,
    #[serde(default)]
    status: bool,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Deserialize)]
struct DevicesFields {
    #[serde(default)]
    devices: Vec<DeviceInfo>,
}

#[derive(Deserialize)]
struct ControlFields {
    #[serde(default)]
    device: String,
    #[serde(default)]
    field: u16,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Deserialize)]
struct EventFields {
    #[serde(rename = "type", default)]
    event_type: u64,
    #[serde(default)]
    device: Option<DeviceInfo>,
}

fn fields<T: for<'de> Deserialize<'de>>(rest: Map<String, Value>) -> IpcResult<T> {
    Ok(serde_json::from_value(Value::Object(rest))?)
}

/// Inbound document with its header parsed and its body still raw.
///
/// Splitting the two steps lets the client fail the matching request when a
/// reply carries a valid `reqid` but a body that does not decode.
#[derive(Debug, Clone)]
pub struct RawInbound {
    command: Command,
    reqid: Option<u64>,
    status: bool,
    rest: Map<String, Value>,
}

impl RawInbound {
    /// Parse the envelope fields (`cmd`, `reqid`, `status`)
    pub fn parse(text: &str) -> IpcResult<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(Self {
            command: Command::from_code(envelope.cmd),
            reqid: envelope.reqid,
            status: envelope.status,
            rest: envelope.rest,
        })
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// Request id of a reply; events never carry one
    pub fn reqid(&self) -> Option<u64> {
        if self.command == Command::Event {
            None
        } else {
            self.reqid
        }
    }

    /// Decode the command-specific body
    pub fn decode(self) -> IpcResult<Inbound> {
        let command = self.command;
        if command == Command::Event {
            let event: EventFields = fields(self.rest)?;
            return Ok(Inbound::Event(Event {
                event_type: EventType::from_code(event.event_type),
                device: event.device,
            }));
        }

        let reqid = self.reqid.ok_or_else(|| {
            IpcError::DecodingFailed(format!("{command} reply without reqid"))
        })?;

        let body = match command {
            Command::Register => ResponseBody::Register,
            Command::Devices => ResponseBody::Devices(fields::<DevicesFields>(self.rest)?.devices),
            Command::ZmkControlRead => {
                let control: ControlFields = fields(self.rest)?;
                let data = match control.data.as_deref() {
                    Some(hex) => hex_to_bytes(hex)?,
                    None => Vec::new(),
                };
                ResponseBody::Read {
                    device: control.device,
                    field: ConfigField::from_id(control.field),
                    data,
                }
            }
            Command::ZmkControlWrite => {
                let control: ControlFields = fields(self.rest)?;
                ResponseBody::Write {
                    device: control.device,
                    field: ConfigField::from_id(control.field),
                }
            }
            Command::Event | Command::Unrecognized(_) => ResponseBody::Other(self.rest),
        };

        Ok(Inbound::Response(Response {
            command,
            reqid,
            status: self.status,
            body,
        }))
    }
}

/// Parse one inbound JSON document
pub fn decode_inbound(text: &str) -> IpcResult<Inbound> {
    RawInbound::parse(text)?.decode()
}
