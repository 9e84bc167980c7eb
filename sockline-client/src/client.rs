//! TCP client component
//!
//! [`TcpClient`] owns a single outbound TCP connection and reports its
//! lifecycle to a host through callbacks.
//!
//! # Lifecycle
//! 1. **Initialize**: validate the endpoint and allocate the receive buffer
//! 2. **Connect**: start the handshake on a background task (non-blocking)
//! 3. **Use**: transmit bytes; received bytes arrive through ReceiveData
//! 4. **Disconnect**: close the socket; Connect may be called again
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use sockline_client::TcpClient;
//!
//! # async fn run() -> sockline_core::ClientResult<()> {
//! let client = TcpClient::new();
//! client.on_receive_data(|data| println!("rx: {}", String::from_utf8_lossy(data)));
//! client.on_connected_fb_status(|status| println!("connected: {}", status));
//!
//! client.initialize("192.168.1.50", 23, 1024)?;
//! client.connect()?;
//! // ... once ConnectedFbStatus(1) was reported:
//! client.data_transmit("PWR ON\r").await?;
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use crate::events::{ClientEvent, ClientEventListener};
use crate::session::Session;
use crate::shared::{SessionSignal, Shared};
use bytes::BytesMut;
use sockline_core::{
    ClientConfig, ClientError, ClientResult, ClientStatistics, ConnectionState, Endpoint,
    LINK_DOWN, LINK_UP, SocketStatus,
};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::watch;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Callback-driven TCP client
///
/// All methods take `&self`; the client is `Send + Sync` and can be shared
/// behind an `Arc`. Operations are still meant to be issued by one caller at
/// a time: concurrent Connect/Disconnect pairs are not ordered.
///
/// Callbacks run on the background task that performs the handshake and the
/// receive loop (ErrorStatus raised by a failed call runs on the caller).
pub struct TcpClient {
    shared: Arc<Shared>,
    handle: Option<Handle>,
}

impl TcpClient {
    /// Create a client with the default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with an explicit configuration
    ///
    /// Background work is spawned on the runtime that is current when
    /// [`connect`](Self::connect) is called.
    pub fn with_config(config: ClientConfig) -> Self {
        let id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::new(Shared::new(id, config)),
            handle: None,
        }
    }

    /// Create a client whose background work runs on `handle`
    ///
    /// Lets hosts without an ambient runtime (plain threads) drive the client:
    /// Connect may then be called from any thread.
    pub fn with_handle(config: ClientConfig, handle: Handle) -> Self {
        let mut client = Self::with_config(config);
        client.handle = Some(handle);
        client
    }

    /// Initialize the endpoint and receive buffer
    ///
    /// Reports `InitializedStatus(1)` on success. On failure reports
    /// `InitializedStatus(0)` and ErrorStatus, and leaves the previous
    /// configuration untouched.
    ///
    /// # Errors
    /// - [`ClientError::Validation`] for an empty host, a port outside
    ///   `1..=65535` or a zero buffer size
    /// - [`ClientError::State`] while connecting or connected
    pub fn initialize(&self, host: &str, port: u32, buffer_size: u32) -> ClientResult<()> {
        let result = Endpoint::new(host, port, buffer_size).and_then(|endpoint| {
            let mut core = self.shared.core.lock();
            if !core.state.can_initialize() {
                return Err(ClientError::state("initialize", core.state));
            }
            // A pending reconnect belongs to the old endpoint.
            core.stop_session();
            core.receive_buffer = Some(BytesMut::with_capacity(endpoint.buffer_size()));
            core.endpoint = Some(endpoint.clone());
            core.state = ConnectionState::Initialized;
            core.socket_status = SocketStatus::NoConnect;
            Ok(endpoint)
        });

        match result {
            Ok(endpoint) => {
                log::info!(
                    "TCP client initialized: {} (buffer {} bytes)",
                    endpoint,
                    endpoint.buffer_size()
                );
                self.shared.emit(ClientEvent::Initialized(LINK_UP));
                Ok(())
            }
            Err(e) => {
                self.shared.emit(ClientEvent::Initialized(LINK_DOWN));
                self.shared.emit(ClientEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Start connecting to the initialized endpoint
    ///
    /// Returns as soon as the handshake is scheduled; the outcome arrives
    /// through ConnectedFbStatus and ConnectionStatus (plus ErrorStatus on
    /// failure). Calling it while connected re-signals the current status;
    /// calling it while connecting does nothing.
    ///
    /// # Errors
    /// - [`ClientError::State`] before a successful [`initialize`](Self::initialize)
    /// - [`ClientError::Connection`] if no tokio runtime is available
    pub fn connect(&self) -> ClientResult<()> {
        let state = self.state();
        match state {
            ConnectionState::Connected => {
                self.shared.emit(ClientEvent::ConnectedFb(LINK_UP));
                self.shared
                    .emit(ClientEvent::ConnectionStatus(SocketStatus::Connected));
                return Ok(());
            }
            ConnectionState::Connecting => return Ok(()),
            ConnectionState::Uninitialized => {
                return Err(self.reject(ClientError::state("connect", state)));
            }
            ConnectionState::Initialized
            | ConnectionState::Disconnected
            | ConnectionState::Error => {}
        }

        let handle = match self.handle.clone().or_else(|| Handle::try_current().ok()) {
            Some(handle) => handle,
            None => {
                return Err(self.reject(ClientError::Connection(std::io::Error::other(
                    "no tokio runtime available to run the connection",
                ))));
            }
        };

        let (generation, endpoint, buffer, control) = {
            let mut core = self.shared.core.lock();
            if !core.state.can_connect() {
                return Err(ClientError::state("connect", core.state));
            }
            let Some(endpoint) = core.endpoint.clone() else {
                return Err(ClientError::state("connect", core.state));
            };
            core.stop_session();
            let (tx, rx) = watch::channel(SessionSignal::Run);
            core.control = Some(tx);
            core.state = ConnectionState::Connecting;
            core.socket_status = SocketStatus::Waiting;
            let buffer = core
                .receive_buffer
                .take()
                .unwrap_or_else(|| BytesMut::with_capacity(endpoint.buffer_size()));
            (core.generation, endpoint, buffer, rx)
        };

        log::info!("Connecting to {}", endpoint);
        self.shared
            .trace(format_args!("state {} -> Connecting", state));
        self.shared
            .emit(ClientEvent::ConnectionStatus(SocketStatus::Waiting));

        let session = Session::new(self.shared.clone(), generation, endpoint);
        let worker = handle.spawn(session.run(control, buffer));

        let mut core = self.shared.core.lock();
        if core.generation == generation {
            core.worker = Some(worker);
        }
        Ok(())
    }

    /// Close the connection
    ///
    /// Cancels a pending handshake or reconnect, unblocks an in-flight
    /// [`data_transmit`](Self::data_transmit) and the receive loop, clears the
    /// receive buffer contents and reports `ConnectedFbStatus(0)`. Calling it
    /// again once disconnected is a no-op.
    ///
    /// # Errors
    /// [`ClientError::State`] if the client was never connected
    pub async fn disconnect(&self) -> ClientResult<()> {
        let (from, worker) = {
            let mut core = self.shared.core.lock();
            let from = core.state;
            match from {
                ConnectionState::Disconnected => return Ok(()),
                ConnectionState::Uninitialized | ConnectionState::Initialized => {
                    drop(core);
                    return Err(self.reject(ClientError::state("disconnect", from)));
                }
                ConnectionState::Connecting
                | ConnectionState::Connected
                | ConnectionState::Error => {}
            }
            let worker = core.stop_session();
            core.state = ConnectionState::Disconnected;
            core.socket_status = SocketStatus::BrokenLocally;
            (from, worker)
        };
        self.shared
            .trace(format_args!("state {} -> Disconnected", from));

        self.shared.close_writer(None).await;
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                log::error!("Connection task ended abnormally: {}", e);
            }
        }

        self.shared.statistics.lock().increment_disconnects();
        if let Some(endpoint) = self.endpoint() {
            log::info!("Disconnected from {}", endpoint);
        }
        self.shared.emit(ClientEvent::ConnectedFb(LINK_DOWN));
        self.shared
            .emit(ClientEvent::ConnectionStatus(SocketStatus::BrokenLocally));
        Ok(())
    }

    /// Send bytes to the peer
    ///
    /// Waits until every byte is written (partial writes are retried), the
    /// write timeout expires, or the client is disconnected. A failed write
    /// moves the client to Error and reports `ConnectedFbStatus(0)`, the
    /// "Link Lost" status and ErrorStatus.
    ///
    /// # Errors
    /// - [`ClientError::NotConnected`] unless connected; nothing is sent
    /// - [`ClientError::Transmit`] if the write fails or times out
    /// - [`ClientError::Cancelled`] if a disconnect interrupts the write
    pub async fn data_transmit(&self, payload: impl AsRef<[u8]>) -> ClientResult<()> {
        let payload = payload.as_ref();

        let (generation, mut control) = {
            let core = self.shared.core.lock();
            if !core.state.is_connected() {
                let err = ClientError::NotConnected(core.state);
                drop(core);
                return Err(self.reject(err));
            }
            (core.generation, core.control.as_ref().map(|tx| tx.subscribe()))
        };

        let mut slot = self.shared.writer.lock().await;
        let writer = match slot.as_mut() {
            Some(active) if active.generation == generation => Some(&mut active.writer),
            _ => None,
        };
        let Some(writer) = writer else {
            // The link failed or closed while we waited for the writer.
            drop(slot);
            return Err(self.reject(ClientError::NotConnected(self.state())));
        };

        let result = match control.as_mut() {
            Some(control) => {
                tokio::select! {
                    biased;
                    _ = control.changed() => Err(ClientError::Cancelled),
                    result = writer.write_all(payload) => result,
                }
            }
            None => writer.write_all(payload).await,
        };

        match result {
            Ok(()) => {
                drop(slot);
                self.shared.statistics.lock().record_transmit(payload.len());
                self.shared.trace_bytes("tx", payload);
                Ok(())
            }
            Err(ClientError::Cancelled) => {
                drop(slot);
                self.shared.trace(format_args!(
                    "transmit of {} bytes cancelled by disconnect",
                    payload.len()
                ));
                Err(ClientError::Cancelled)
            }
            Err(e) => {
                let failed = slot.take();
                drop(slot);
                if let Some(mut failed) = failed {
                    let _ = failed.writer.close().await;
                }

                let err = match e {
                    ClientError::Transmit(_) => e,
                    other => ClientError::Transmit(other.to_string()),
                };
                if self.shared.enter_error(generation, SocketStatus::LinkLost) {
                    if let Some(control) = self.shared.core.lock().control.as_ref() {
                        let _ = control.send(SessionSignal::WriteFailed);
                    }
                    log::error!("Transmit failed: {}", err);
                    self.shared
                        .report_link_down(SocketStatus::LinkLost, err.to_string());
                }
                Err(err)
            }
        }
    }

    /// Enable verbose logging of state transitions and raw bytes
    pub fn enable_debug(&self) {
        self.shared.set_debug(true);
        log::info!("[client {}] Debug enabled", self.shared.id);
    }

    /// Disable verbose logging
    pub fn disable_debug(&self) {
        self.shared.set_debug(false);
        log::info!("[client {}] Debug disabled", self.shared.id);
    }

    /// Check if verbose logging is enabled
    pub fn is_debug_enabled(&self) -> bool {
        self.shared.is_debug()
    }

    /// Identity hash of this instance, stable for its lifetime
    pub fn hash_code(&self) -> i32 {
        let mut hasher = DefaultHasher::new();
        self.shared.id.hash(&mut hasher);
        let hash = hasher.finish();
        (hash ^ (hash >> 32)) as i32
    }

    /// Register the ReceiveData handler, replacing any previous one
    pub fn on_receive_data<F>(&self, handler: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.shared.callbacks.write().set_receive_data(handler);
    }

    /// Register the ConnectedFbStatus handler, replacing any previous one
    pub fn on_connected_fb_status<F>(&self, handler: F)
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.shared.callbacks.write().set_connected_fb_status(handler);
    }

    /// Register the ConnectionStatus handler, replacing any previous one
    ///
    /// The handler receives the socket status name and the link flag.
    pub fn on_connection_status<F>(&self, handler: F)
    where
        F: Fn(&str, u16) + Send + Sync + 'static,
    {
        self.shared.callbacks.write().set_connection_status(handler);
    }

    /// Register the InitializedStatus handler, replacing any previous one
    pub fn on_initialized_status<F>(&self, handler: F)
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.shared.callbacks.write().set_initialized_status(handler);
    }

    /// Register the ErrorStatus handler, replacing any previous one
    pub fn on_error_status<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.callbacks.write().set_error_status(handler);
    }

    /// Route every event category to `listener`
    pub fn set_listener(&self, listener: Arc<dyn ClientEventListener>) {
        self.shared.callbacks.write().set_listener(listener);
    }

    /// Remove every registered handler
    pub fn clear_callbacks(&self) {
        self.shared.callbacks.write().clear();
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.core.lock().state
    }

    /// Check if the client is connected
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Most recent socket status
    pub fn socket_status(&self) -> SocketStatus {
        self.shared.core.lock().socket_status
    }

    /// Configured endpoint, if initialized
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.shared.core.lock().endpoint.clone()
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Snapshot of the traffic and connection counters
    pub fn statistics(&self) -> ClientStatistics {
        self.shared.statistics.lock().clone()
    }

    /// Capacity and current length of the receive buffer
    ///
    /// `None` before Initialize and while the buffer is lent to a running
    /// connection.
    pub fn receive_buffer_usage(&self) -> Option<(usize, usize)> {
        self.shared
            .core
            .lock()
            .receive_buffer
            .as_ref()
            .map(|buffer| (buffer.capacity(), buffer.len()))
    }

    /// Report `err` through ErrorStatus and hand it back
    fn reject(&self, err: ClientError) -> ClientError {
        self.shared.emit(ClientEvent::Error(err.to_string()));
        err
    }
}

impl Default for TcpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TcpClient {
    fn drop(&mut self) {
        // Detached background work must not outlive the handle.
        self.shared.core.lock().stop_session();
    }
}

impl fmt::Display for TcpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        match &core.endpoint {
            Some(endpoint) => write!(f, "{} {}", endpoint, core.state),
            None => write!(f, "{}", core.state),
        }
    }
}

impl fmt::Debug for TcpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("TcpClient")
            .field("id", &self.shared.id)
            .field("endpoint", &core.endpoint)
            .field("state", &core.state)
            .field("socket_status", &core.socket_status)
            .finish()
    }
}

impl PartialEq for TcpClient {
    fn eq(&self, other: &Self) -> bool {
        self.shared.id == other.shared.id
    }
}

impl Eq for TcpClient {}

impl Hash for TcpClient {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shared.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(client: &TcpClient) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        client.on_initialized_status(move |s| sink.lock().push(format!("init:{}", s)));
        let sink = log.clone();
        client.on_error_status(move |e| sink.lock().push(format!("error:{}", e)));
        log
    }

    #[test]
    fn test_initialize_then_display() {
        let client = TcpClient::new();
        let log = recorder(&client);
        assert_eq!(client.to_string(), "Uninitialized");

        client.initialize("10.0.0.5", 4998, 2048).unwrap();
        assert_eq!(client.state(), ConnectionState::Initialized);
        let text = client.to_string();
        assert!(text.contains("10.0.0.5"));
        assert!(text.contains("4998"));
        assert_eq!(text, "10.0.0.5:4998 Initialized");
        assert_eq!(*log.lock(), vec!["init:1".to_string()]);
        assert_eq!(client.receive_buffer_usage().map(|(cap, len)| (cap >= 2048, len)), Some((true, 0)));
    }

    #[test]
    fn test_initialize_validation_failure() {
        let client = TcpClient::new();
        let log = recorder(&client);

        let err = client.initialize("", 23, 1024).unwrap_err();
        assert_eq!(err.kind(), sockline_core::ErrorKind::Validation);
        assert!(client.initialize("10.0.0.5", 0, 1024).is_err());
        assert!(client.initialize("10.0.0.5", 70000, 1024).is_err());
        assert!(client.initialize("10.0.0.5", 23, 0).is_err());
        assert_eq!(client.state(), ConnectionState::Uninitialized);

        let log = log.lock();
        assert_eq!(log.iter().filter(|e| *e == "init:0").count(), 4);
        assert_eq!(log.iter().filter(|e| e.starts_with("error:")).count(), 4);
    }

    #[test]
    fn test_initialize_accepts_any_host_text() {
        let client = TcpClient::new();
        for host in ["my_host", "fe80::1%2", "0:0:0:0:0:0:0:1", "panel.av.local"] {
            client.initialize(host, 23, 64).unwrap();
            let text = client.to_string();
            assert!(text.contains(host), "{} missing from {}", host, text);
            assert!(text.contains("23"));
        }
        client.initialize("10.0.0.1", 23, 32 * 1024 * 1024).unwrap();
        assert_eq!(client.endpoint().unwrap().buffer_size(), 32 * 1024 * 1024);
    }

    #[test]
    fn test_failed_reinitialize_keeps_endpoint() {
        let client = TcpClient::new();
        client.initialize("10.0.0.5", 23, 64).unwrap();
        assert!(client.initialize("10.0.0.6", 0, 64).is_err());
        assert_eq!(client.endpoint().unwrap().host(), "10.0.0.5");
        assert_eq!(client.state(), ConnectionState::Initialized);
    }

    #[test]
    fn test_connect_before_initialize() {
        let client = TcpClient::new();
        let log = recorder(&client);
        let err = client.connect().unwrap_err();
        assert!(matches!(err, ClientError::State { operation: "connect", .. }));
        assert_eq!(client.state(), ConnectionState::Uninitialized);
        assert_eq!(client.statistics().connect_attempts, 0);
        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_transmit_requires_connection() {
        let client = TcpClient::new();
        let log = recorder(&client);
        client.initialize("10.0.0.5", 23, 64).unwrap();

        let err = client.data_transmit(b"hello").await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected(ConnectionState::Initialized)));
        assert!(log.lock().iter().any(|e| e.contains("not connected")));
        assert_eq!(client.statistics().transmits, 0);
    }

    #[tokio::test]
    async fn test_disconnect_from_initialized_is_state_error() {
        let client = TcpClient::new();
        client.initialize("10.0.0.5", 23, 64).unwrap();
        let err = client.disconnect().await.unwrap_err();
        assert_eq!(err.kind(), sockline_core::ErrorKind::State);
    }

    #[test]
    fn test_hash_code_is_stable_and_distinct() {
        let a = TcpClient::new();
        let b = TcpClient::new();
        assert_eq!(a.hash_code(), a.hash_code());
        a.initialize("10.0.0.5", 23, 64).unwrap();
        assert_eq!(a.hash_code(), a.hash_code());
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_toggle() {
        let client = TcpClient::new();
        assert!(!client.is_debug_enabled());
        client.enable_debug();
        assert!(client.is_debug_enabled());
        client.disable_debug();
        assert!(!client.is_debug_enabled());
    }

    #[test]
    fn test_connect_without_runtime() {
        let client = TcpClient::new();
        client.initialize("127.0.0.1", 9, 64).unwrap();
        let err = client.connect().unwrap_err();
        assert_eq!(err.kind(), sockline_core::ErrorKind::Connection);
        assert_eq!(client.state(), ConnectionState::Initialized);
    }
}
