//! RPC client for the BoardPilot service
//!
//! The client owns one transport at a time, numbers outgoing requests and
//! routes each reply back to whoever is waiting for it. Unsolicited device
//! events go to the [`DeviceRegistry`].
//!
//! Lifecycle:
//!
//! 1. [`RpcClient::attach`] (or [`RpcClient::connect`]) installs a transport;
//!    the client is `Connecting`.
//! 2. `Opened` moves it to `Connected` and sends `REGISTER` with the shared key.
//! 3. A successful registration fetches the device list.
//! 4. `Closed` moves it back to `Disconnected` and fails every outstanding
//!    request with [`IpcError::ConnectionLost`].
//!
//! All inbound events are handled by whichever task drives
//! [`RpcClient::run`], one at a time, in transport order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use boardpilot_codec::ConfigField;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::DEFAULT_API_KEY;
use crate::error::{IpcError, IpcResult};
use crate::protocol::{
    Command, Event, EventType, Inbound, RawInbound, Request, Response, ResponseBody,
};
use crate::registry::{Device, DeviceRegistry};
use crate::transport::{TcpTransport, Transport, TransportConfig, TransportEvent};

/// Default time to wait for a reply
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Shared key sent with `REGISTER`
    pub api_key: String,
    /// How long [`RpcClient::call`] waits for a reply
    pub request_timeout: Duration,
    /// Fetch the device list as soon as registration succeeds
    pub auto_fetch_devices: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            auto_fetch_devices: true,
        }
    }
}

impl ClientConfig {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn auto_fetch_devices(mut self, enable: bool) -> Self {
        self.auto_fetch_devices = enable;
        self
    }
}

/// Transport connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Outcome of the `REGISTER` handshake for the current connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    Pending,
    Registered,
    Rejected,
}

/// Snapshot published to [`RpcClient::subscribe_status`] subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub connection: ConnectionState,
    pub registration: Registration,
}

impl Default for ClientStatus {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            registration: Registration::Pending,
        }
    }
}

/// Reply to `read_config`
#[derive(Debug, Clone)]
pub struct ReadConfigReply {
    /// Field that was requested
    pub field: ConfigField,
    /// Registry entry for the serial in the reply, if still known
    pub device: Option<Device>,
    pub status: bool,
    pub data: Vec<u8>,
}

/// Reply to `write_config`
#[derive(Debug, Clone)]
pub struct WriteConfigReply {
    /// Field that was written
    pub field: ConfigField,
    /// Registry entry for the serial in the reply, if still known
    pub device: Option<Device>,
    pub status: bool,
}

/// What to do when the reply for a request id arrives
enum Completion {
    /// Hand the reply to a waiting caller
    Reply(oneshot::Sender<IpcResult<Response>>),
    /// Registration handshake result
    Handshake,
    /// Merge the device list into the registry
    DeviceList,
}

struct ClientInner {
    config: ClientConfig,
    registry: Arc<DeviceRegistry>,
    next_reqid: AtomicU64,
    /// Bumped on every attach so events from a replaced transport are ignored
    generation: AtomicU64,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    pending: Mutex<HashMap<u64, Completion>>,
    status: watch::Sender<ClientStatus>,
}

/// Handle to a request whose reply has not been consumed yet
pub struct PendingReply {
    reqid: u64,
    rx: oneshot::Receiver<IpcResult<Response>>,
    inner: Arc<ClientInner>,
}

impl PendingReply {
    pub fn reqid(&self) -> u64 {
        self.reqid
    }

    /// Wait for the reply with no deadline
    pub async fn wait(self) -> IpcResult<Response> {
        self.rx.await.unwrap_or(Err(IpcError::ConnectionLost))
    }

    /// Wait for the reply; on timeout the request is forgotten
    pub async fn wait_timeout(self, timeout: Duration) -> IpcResult<Response> {
        let Self { reqid, rx, inner } = self;
        match tokio::time::timeout(timeout, rx).await {
            Ok(result) => result.unwrap_or(Err(IpcError::ConnectionLost)),
            Err(_elapsed) => {
                inner.pending.lock().remove(&reqid);
                warn!(reqid, timeout_ms = timeout.as_millis(), "Request timed out");
                Err(IpcError::timeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }
}

/// Client for the BoardPilot service
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

impl RpcClient {
    /// Create a client with its own device registry
    pub fn new(config: ClientConfig) -> Self {
        Self::with_registry(config, Arc::new(DeviceRegistry::new()))
    }

    /// Create a client that feeds an existing registry
    pub fn with_registry(config: ClientConfig, registry: Arc<DeviceRegistry>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                registry,
                next_reqid: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                transport: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                status: watch::Sender::new(ClientStatus::default()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.inner.registry
    }

    pub fn status(&self) -> ClientStatus {
        *self.inner.status.borrow()
    }

    pub fn state(&self) -> ConnectionState {
        self.status().connection
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn is_registered(&self) -> bool {
        self.status().registration == Registration::Registered
    }

    /// Watch connection and registration changes
    pub fn subscribe_status(&self) -> watch::Receiver<ClientStatus> {
        self.inner.status.subscribe()
    }

    /// Number of requests still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Install a transport. Its events must then be fed to
    /// [`RpcClient::handle_event`] or [`RpcClient::run`].
    pub fn attach(&self, transport: Arc<dyn Transport>) {
        info!(transport = %transport.description(), "Attaching transport");
        let previous = self.inner.transport.lock().replace(transport);
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(previous) = previous {
            previous.close();
            let failed = self.fail_pending();
            debug!(failed_requests = failed, "Replaced previous transport");
        }
        self.set_status(ConnectionState::Connecting, Registration::Pending);
    }

    /// Connect over TCP and spawn the event loop.
    ///
    /// Returns once the socket is connected; registration continues in the
    /// background (see [`RpcClient::wait_until_registered`]).
    pub async fn connect(&self, config: &TransportConfig) -> IpcResult<JoinHandle<()>> {
        let (transport, events) = TcpTransport::connect(config).await?;
        self.attach(Arc::new(transport));
        let generation = self.inner.generation.load(Ordering::Acquire);
        let client = self.clone();
        Ok(tokio::spawn(async move {
            client.run_generation(generation, events).await
        }))
    }

    /// Pump events of the currently attached transport until it closes
    pub async fn run(&self, events: mpsc::UnboundedReceiver<TransportEvent>) {
        let generation = self.inner.generation.load(Ordering::Acquire);
        self.run_generation(generation, events).await;
    }

    async fn run_generation(
        &self,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            if self.inner.generation.load(Ordering::Acquire) != generation {
                debug!("Transport replaced, stopping its event loop");
                return;
            }
            let closed = matches!(event, TransportEvent::Closed { .. });
            self.handle_event(event);
            if closed {
                return;
            }
        }
        if self.inner.generation.load(Ordering::Acquire) == generation {
            self.handle_closed(Some("event stream ended".to_string()));
        }
    }

    /// Close the transport and fail outstanding requests
    pub fn disconnect(&self) {
        let transport = self.inner.transport.lock().clone();
        if let Some(transport) = transport {
            transport.close();
        }
        self.handle_closed(Some("disconnected by client".to_string()));
    }

    /// Process one transport event
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.handle_opened(),
            TransportEvent::Closed { reason } => self.handle_closed(reason),
            TransportEvent::Message(text) => self.handle_message(&text),
        }
    }

    /// Process one inbound JSON document.
    ///
    /// A reply whose body does not decode still completes its request, with
    /// the decode error.
    pub fn handle_message(&self, text: &str) {
        let raw = match RawInbound::parse(text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, message = %text, "Dropping malformed message");
                return;
            }
        };
        let reqid = raw.reqid();
        match (raw.decode(), reqid) {
            (Ok(Inbound::Response(response)), _) => self.complete(response),
            (Ok(Inbound::Event(event)), _) => self.handle_service_event(event),
            (Err(e), Some(reqid)) => self.fail_request(reqid, e),
            (Err(e), None) => warn!(error = %e, message = %text, "Dropping malformed message"),
        }
    }

    /// Send a request and get a handle to await its reply
    pub fn request(&self, request: Request) -> IpcResult<PendingReply> {
        let (tx, rx) = oneshot::channel();
        let reqid = self.dispatch(&request, Some(Completion::Reply(tx)))?;
        Ok(PendingReply {
            reqid,
            rx,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Send a request whose reply is ignored
    pub fn send(&self, request: Request) -> IpcResult<u64> {
        self.dispatch(&request, None)
    }

    /// Send a request and wait for its reply within the configured timeout
    pub async fn call(&self, request: Request) -> IpcResult<Response> {
        self.request(request)?
            .wait_timeout(self.inner.config.request_timeout)
            .await
    }

    /// Ask for the device list; the registry is updated when it arrives
    pub fn fetch_devices(&self) -> IpcResult<u64> {
        self.dispatch(&Request::Devices, Some(Completion::DeviceList))
    }

    /// Fetch the device list, merge it and return the registry contents
    pub async fn refresh_devices(&self) -> IpcResult<Vec<Device>> {
        let response = self.call(Request::Devices).await?;
        match response.body {
            ResponseBody::Devices(devices) => Ok(self.inner.registry.merge_device_list(devices)),
            _ => Err(unexpected(Command::Devices, response.command)),
        }
    }

    /// Read one config field from `device`
    pub async fn read_config(
        &self,
        device: &Device,
        field: ConfigField,
    ) -> IpcResult<ReadConfigReply> {
        let response = self
            .call(Request::ReadConfig {
                device: device.serial().to_string(),
                field,
            })
            .await?;

        match response.body {
            ResponseBody::Read { device, data, .. } => Ok(ReadConfigReply {
                field,
                device: self.inner.registry.find_device(&device),
                status: response.status,
                data,
            }),
            _ => Err(unexpected(Command::ZmkControlRead, response.command)),
        }
    }

    /// Write one config field to `device`, persisting it when `save` is set
    pub async fn write_config(
        &self,
        device: &Device,
        field: ConfigField,
        data: &[u8],
        save: bool,
    ) -> IpcResult<WriteConfigReply> {
        let response = self
            .call(Request::WriteConfig {
                device: device.serial().to_string(),
                field,
                data: data.to_vec(),
                save,
            })
            .await?;

        match response.body {
            ResponseBody::Write { device, .. } => Ok(WriteConfigReply {
                field,
                device: self.inner.registry.find_device(&device),
                status: response.status,
            }),
            _ => Err(unexpected(Command::ZmkControlWrite, response.command)),
        }
    }

    pub fn selected_device(&self) -> IpcResult<Device> {
        self.inner
            .registry
            .selected_device()
            .ok_or(IpcError::NoDeviceSelected)
    }

    /// [`RpcClient::read_config`] against the selected device
    pub async fn read_selected_config(&self, field: ConfigField) -> IpcResult<ReadConfigReply> {
        let device = self.selected_device()?;
        self.read_config(&device, field).await
    }

    /// [`RpcClient::write_config`] against the selected device
    pub async fn write_selected_config(
        &self,
        field: ConfigField,
        data: &[u8],
        save: bool,
    ) -> IpcResult<WriteConfigReply> {
        let device = self.selected_device()?;
        self.write_config(&device, field, data, save).await
    }

    /// Wait for the registration handshake of the current connection
    pub async fn wait_until_registered(&self, timeout: Duration) -> IpcResult<()> {
        let mut status = self.subscribe_status();
        let settled = tokio::time::timeout(
            timeout,
            status.wait_for(|s| {
                s.registration != Registration::Pending
                    || s.connection == ConnectionState::Disconnected
            }),
        )
        .await
        .map_err(|_elapsed| {
            IpcError::timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
        })?
        .map(|s| *s)
        .map_err(|_closed| IpcError::ConnectionLost)?;

        match settled.registration {
            Registration::Registered => Ok(()),
            Registration::Rejected => Err(IpcError::RegistrationRejected),
            Registration::Pending => Err(IpcError::ConnectionLost),
        }
    }

    fn set_status(&self, connection: ConnectionState, registration: Registration) {
        self.inner.status.send_modify(|status| {
            status.connection = connection;
            status.registration = registration;
        });
    }

    fn set_registration(&self, registration: Registration) {
        self.inner
            .status
            .send_modify(|status| status.registration = registration);
    }

    fn connected_transport(&self) -> IpcResult<Arc<dyn Transport>> {
        if !self.is_connected() {
            return Err(IpcError::NotConnected);
        }
        self.inner
            .transport
            .lock()
            .clone()
            .filter(|transport| transport.is_open())
            .ok_or(IpcError::NotConnected)
    }

    fn dispatch(&self, request: &Request, completion: Option<Completion>) -> IpcResult<u64> {
        let transport = self.connected_transport()?;
        let reqid = self.inner.next_reqid.fetch_add(1, Ordering::Relaxed);
        let text = request.encode(reqid)?;

        if let Some(completion) = completion {
            self.inner.pending.lock().insert(reqid, completion);
        }
        if let Err(e) = transport.send(text) {
            self.inner.pending.lock().remove(&reqid);
            return Err(e);
        }

        debug!(reqid, cmd = %request.command(), "Request sent");
        Ok(reqid)
    }

    fn handle_opened(&self) {
        info!("Service connection open, registering");
        self.set_status(ConnectionState::Connected, Registration::Pending);

        let register = Request::Register {
            key: self.inner.config.api_key.clone(),
        };
        if let Err(e) = self.dispatch(&register, Some(Completion::Handshake)) {
            warn!(error = %e, "Failed to send registration");
        }
    }

    fn handle_closed(&self, reason: Option<String>) {
        self.inner.transport.lock().take();
        let failed = self.fail_pending();
        if self.state() != ConnectionState::Disconnected || failed > 0 {
            info!(reason = ?reason, failed_requests = failed, "Service connection closed");
        }
        self.set_status(ConnectionState::Disconnected, Registration::Pending);
    }

    /// Resolve every outstanding request with `ConnectionLost`
    fn fail_pending(&self) -> usize {
        let drained: Vec<Completion> = self
            .inner
            .pending
            .lock()
            .drain()
            .map(|(_, completion)| completion)
            .collect();

        let failed = drained.len();
        for completion in drained {
            if let Completion::Reply(tx) = completion {
                if tx.send(Err(IpcError::ConnectionLost)).is_err() {
                    debug!("Caller stopped waiting before connection loss");
                }
            }
        }
        failed
    }

    /// Resolve one request with an error instead of a reply
    fn fail_request(&self, reqid: u64, error: IpcError) {
        let completion = self.inner.pending.lock().remove(&reqid);
        match completion {
            None => debug!(reqid, error = %error, "Undecodable reply for unknown request"),
            Some(Completion::Reply(tx)) => {
                warn!(reqid, error = %error, "Reply body did not decode");
                if tx.send(Err(error)).is_err() {
                    debug!("Caller stopped waiting for reply");
                }
            }
            Some(Completion::Handshake) => {
                warn!(reqid, error = %error, "Registration reply did not decode");
            }
            Some(Completion::DeviceList) => {
                warn!(reqid, error = %error, "Device list reply did not decode");
            }
        }
    }

    fn complete(&self, response: Response) {
        let completion = self.inner.pending.lock().remove(&response.reqid);
        match completion {
            None => debug!(reqid = response.reqid, "Reply for unknown request"),
            Some(Completion::Reply(tx)) => {
                if tx.send(Ok(response)).is_err() {
                    debug!("Caller stopped waiting for reply");
                }
            }
            Some(Completion::Handshake) => self.on_registration(&response),
            Some(Completion::DeviceList) => self.on_device_list(response),
        }
    }

    fn on_registration(&self, response: &Response) {
        if !response.status {
            warn!("Service rejected registration, check the service key");
            self.set_registration(Registration::Rejected);
            return;
        }

        info!("Registered with service");
        self.set_registration(Registration::Registered);
        if self.inner.config.auto_fetch_devices {
            if let Err(e) = self.fetch_devices() {
                warn!(error = %e, "Failed to request device list");
            }
        }
    }

    fn on_device_list(&self, response: Response) {
        match response.body {
            ResponseBody::Devices(devices) => {
                self.inner.registry.merge_device_list(devices);
            }
            _ => warn!(cmd = %response.command, "Device list request got a different reply"),
        }
    }

    fn handle_service_event(&self, event: Event) {
        match (event.event_type, event.device) {
            (EventType::DeviceConnected, Some(info)) => {
                self.inner.registry.apply_connected(info);
            }
            (EventType::DeviceDisconnected, Some(info)) => {
                self.inner.registry.apply_disconnected(info.serial());
            }
            (EventType::DeviceConnected | EventType::DeviceDisconnected, None) => {
                warn!(event = ?event.event_type, "Device event without device");
            }
            (EventType::None, _) => debug!("Empty event"),
            (EventType::Unrecognized(code), _) => warn!(code, "Ignoring unknown event type"),
        }
    }
}

fn unexpected(expected: Command, actual: Command) -> IpcError {
    IpcError::UnexpectedResponse {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}
