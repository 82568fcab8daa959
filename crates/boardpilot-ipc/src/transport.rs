//! Transport abstraction for the service connection
//!
//! A transport moves JSON text to the service and reports what comes back as
//! a stream of [`TransportEvent`]s. The client consumes those events from a
//! single task, so delivery order is preserved. Sending never blocks: text is
//! queued to a writer task in call order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{DEFAULT_MAX_MESSAGE_SIZE, JsonFrameDecoder};
use crate::error::{IpcError, IpcResult};
use crate::{DEFAULT_SERVICE_ADDRESS, DEFAULT_SERVICE_PORT};

/// Event reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is ready for traffic
    Opened,
    /// The connection ended; no further events follow
    Closed {
        /// Why it ended, when known
        reason: Option<String>,
    },
    /// One complete inbound JSON document
    Message(String),
}

/// Outbound half of a service connection
pub trait Transport: Send + Sync {
    /// Queue `text` for delivery
    fn send(&self, text: String) -> IpcResult<()>;

    /// Whether the connection is still usable
    fn is_open(&self) -> bool;

    /// Close the connection; a `Closed` event follows
    fn close(&self);

    /// Get a human-readable description of the transport
    fn description(&self) -> String;
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Service host
    pub address: String,
    /// Service port
    pub port: u16,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Largest single inbound document
    pub max_message_size: usize,
    /// Receive buffer size
    pub recv_buffer_size: usize,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_SERVICE_ADDRESS.to_string(),
            port: DEFAULT_SERVICE_PORT,
            connect_timeout: Duration::from_secs(5),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            recv_buffer_size: 8 * 1024,
            nodelay: true,
        }
    }
}

impl TransportConfig {
    /// `host:port` string for connecting
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn validate(&self) -> IpcResult<()> {
        if self.address.trim().is_empty() {
            return Err(IpcError::InvalidConfig("address is empty".to_string()));
        }
        if self.port == 0 {
            return Err(IpcError::InvalidConfig("port must be non-zero".to_string()));
        }
        if self.max_message_size == 0 || self.recv_buffer_size == 0 {
            return Err(IpcError::InvalidConfig(
                "buffer sizes must be non-zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(IpcError::InvalidConfig(
                "connect timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Transport builder for creating transports with configuration
pub struct TransportBuilder {
    config: TransportConfig,
}

impl TransportBuilder {
    /// Create a new transport builder with default configuration
    pub fn new() -> Self {
        Self {
            config: TransportConfig::default(),
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    pub fn nodelay(mut self, enable: bool) -> Self {
        self.config.nodelay = enable;
        self
    }

    /// Build the configuration
    pub fn build(self) -> TransportConfig {
        self.config
    }
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Shared {
    open: AtomicBool,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl Shared {
    /// Emit `Closed` once, whichever side notices first
    fn close(&self, reason: Option<String>) {
        if self.open.swap(false, Ordering::AcqRel) {
            if self.events.send(TransportEvent::Closed { reason }).is_err() {
                debug!("Transport event receiver dropped before close");
            }
        }
    }
}

/// TCP connection to the service.
///
/// Closing stops the reader right away. The writer keeps going until every
/// message queued before the close has been written, then shuts the socket
/// down.
pub struct TcpTransport {
    peer: String,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl TcpTransport {
    /// Connect and start the reader and writer tasks.
    ///
    /// The returned receiver yields `Opened` first, then inbound messages,
    /// then a single `Closed`.
    pub async fn connect(
        config: &TransportConfig,
    ) -> IpcResult<(Self, mpsc::UnboundedReceiver<TransportEvent>)> {
        config.validate()?;
        let peer = config.socket_addr();

        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&peer))
            .await
            .map_err(|elapsed| IpcError::ConnectionFailed(format!("{peer}: {elapsed}")))?
            .map_err(|e| IpcError::ConnectionFailed(format!("{peer}: {e}")))?;
        stream.set_nodelay(config.nodelay)?;
        info!(peer = %peer, "Connected to service");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            open: AtomicBool::new(true),
            events: events_tx,
        });

        if shared.events.send(TransportEvent::Opened).is_err() {
            return Err(IpcError::ConnectionLost);
        }

        let (read_half, write_half) = stream.into_split();
        let reader = tokio::spawn(read_loop(
            read_half,
            JsonFrameDecoder::with_max_size(config.max_message_size),
            config.recv_buffer_size,
            Arc::clone(&shared),
        ));
        // Detached: ends once the outbound sender is dropped and the queue drains
        drop(tokio::spawn(write_loop(
            write_half,
            outbound_rx,
            Arc::clone(&shared),
        )));

        let transport = Self {
            peer,
            outbound: Mutex::new(Some(outbound_tx)),
            shared,
            reader: Mutex::new(Some(reader)),
        };
        Ok((transport, events_rx))
    }
}

impl Transport for TcpTransport {
    fn send(&self, text: String) -> IpcResult<()> {
        if !self.is_open() {
            return Err(IpcError::NotConnected);
        }
        match self.outbound.lock().as_ref() {
            Some(outbound) => outbound
                .send(text)
                .map_err(|_closed| IpcError::ConnectionLost),
            None => Err(IpcError::NotConnected),
        }
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        // Dropping the sender lets the writer flush what is queued and exit
        drop(self.outbound.lock().take());
        self.shared.close(Some("closed by client".to_string()));
    }

    fn description(&self) -> String {
        format!("TCP {}", self.peer)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.get_mut().take() {
            reader.abort();
        }
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    mut decoder: JsonFrameDecoder,
    buffer_size: usize,
    shared: Arc<Shared>,
) {
    let mut buf = vec![0u8; buffer_size];
    let reason = loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => break None,
            Ok(n) => n,
            Err(e) => break Some(e.to_string()),
        };

        decoder.push(buf.get(..n).unwrap_or_default());
        loop {
            match decoder.next_frame() {
                Ok(Some(text)) => {
                    if shared.events.send(TransportEvent::Message(text)).is_err() {
                        debug!("Transport event receiver dropped, stopping reader");
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => warn!(error = %e, "Dropping undecodable inbound data"),
            }
        }
    };

    debug!(reason = ?reason, "Service connection closed");
    shared.close(reason);
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<String>,
    shared: Arc<Shared>,
) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = write_half.write_all(text.as_bytes()).await {
            warn!(error = %e, "Write to service failed");
            shared.close(Some(e.to_string()));
            return;
        }
    }
    if let Err(e) = write_half.shutdown().await {
        debug!(error = %e, "Socket shutdown failed");
    }
}

/// In-memory transport for tests
pub mod mock {
    use super::*;

    /// Records every sent message; open state is controlled by the test
    #[derive(Clone)]
    pub struct MockTransport {
        sent: Arc<Mutex<Vec<String>>>,
        open: Arc<AtomicBool>,
        fail_sends: Arc<AtomicBool>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                open: Arc::new(AtomicBool::new(true)),
                fail_sends: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().clone()
        }

        /// Sent messages parsed back into JSON values
        pub fn sent_json(&self) -> Vec<serde_json::Value> {
            self.sent
                .lock()
                .iter()
                .filter_map(|text| serde_json::from_str(text).ok())
                .collect()
        }

        pub fn last_sent_json(&self) -> Option<serde_json::Value> {
            self.sent_json().pop()
        }

        pub fn clear(&self) {
            self.sent.lock().clear();
        }

        pub fn set_open(&self, open: bool) {
            self.open.store(open, Ordering::Release);
        }

        pub fn fail_sends(&self, fail: bool) {
            self.fail_sends.store(fail, Ordering::Release);
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for MockTransport {
        fn send(&self, text: String) -> IpcResult<()> {
            if !self.is_open() {
                return Err(IpcError::NotConnected);
            }
            if self.fail_sends.load(Ordering::Acquire) {
                return Err(IpcError::ConnectionLost);
            }
            self.sent.lock().push(text);
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::Acquire)
        }

        fn close(&self) {
            self.set_open(false);
        }

        fn description(&self) -> String {
            "Mock transport".to_string()
        }
    }
}
