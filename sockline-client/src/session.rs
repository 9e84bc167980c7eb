//! Background session: handshake, receive loop and optional reconnect
//!
//! One session is spawned per Connect. It owns the read half of the socket
//! and lends the write half to the client through the shared writer slot.
//! Every state change it makes is tagged with its generation, so a session
//! that was superseded by Disconnect, re-Initialize or a new Connect can no
//! longer touch the client or emit events.

use crate::events::ClientEvent;
use crate::shared::{SessionSignal, Shared, WriterSlot};
use bytes::{Bytes, BytesMut};
use sockline_core::{ClientError, ConnectionState, Endpoint, LINK_UP, SocketStatus};
use sockline_transport::{
    StreamReader, TcpReader, TcpSettings, TcpTransport, needs_lookup, resolve,
};
use std::sync::Arc;
use tokio::sync::watch;

/// How a connected link ended
enum LinkEnd {
    /// Shutdown requested or session superseded
    Stopped,
    /// Peer close, read failure or transmit failure
    Failed,
}

pub(crate) struct Session {
    shared: Arc<Shared>,
    generation: u64,
    endpoint: Endpoint,
}

impl Session {
    pub fn new(shared: Arc<Shared>, generation: u64, endpoint: Endpoint) -> Self {
        Self {
            shared,
            generation,
            endpoint,
        }
    }

    /// Run until shut down, or until the link fails with reconnect disabled
    pub async fn run(self, mut control: watch::Receiver<SessionSignal>, mut buffer: BytesMut) {
        self.drive(&mut control, &mut buffer).await;
        self.shared.return_buffer(buffer);
        self.shared
            .trace(format_args!("session {} finished", self.generation));
    }

    async fn drive(&self, control: &mut watch::Receiver<SessionSignal>, buffer: &mut BytesMut) {
        let mut retry = false;
        loop {
            if retry {
                if !self.shared.transition(self.generation, ConnectionState::Connecting) {
                    return;
                }
                self.shared.statistics.lock().increment_reconnect_attempts();
                log::info!("Reconnecting to {}", self.endpoint);
                self.shared.report_status(self.generation, SocketStatus::Waiting);
            }
            retry = true;
            self.shared.statistics.lock().increment_connect_attempts();

            let established = tokio::select! {
                biased;
                _ = wait_for_shutdown(control) => return,
                result = self.establish() => result,
            };

            match established {
                Ok(transport) => {
                    if let LinkEnd::Stopped = self.serve(transport, control, buffer).await {
                        return;
                    }
                }
                Err((status, error)) => {
                    self.shared.statistics.lock().increment_connect_failures();
                    if !self.shared.enter_error(self.generation, status) {
                        return;
                    }
                    log::error!("Connect to {} failed: {}", self.endpoint, error);
                    self.shared.report_link_down(status, error.to_string());
                }
            }

            let Some(interval) = self.shared.config.reconnect_interval else {
                return;
            };
            self.shared
                .trace(format_args!("next connect attempt in {:?}", interval));
            tokio::select! {
                biased;
                _ = wait_for_shutdown(control) => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    async fn establish(&self) -> Result<TcpTransport, (SocketStatus, ClientError)> {
        let config = &self.shared.config;

        let lookup = needs_lookup(&self.endpoint);
        if lookup {
            self.shared.report_status(self.generation, SocketStatus::DnsLookup);
        }
        let resolution = resolve(&self.endpoint, config.connect_timeout)
            .await
            .map_err(|e| (SocketStatus::DnsFailed, e))?;
        if lookup {
            self.shared.trace(format_args!(
                "{} resolved to {:?}",
                self.endpoint.host(),
                resolution.addresses()
            ));
            self.shared.report_status(self.generation, SocketStatus::DnsResolved);
        }

        TcpTransport::connect_any(resolution.addresses(), TcpSettings::from(config))
            .await
            .map_err(|e| (SocketStatus::ConnectFailed, e))
    }

    async fn serve(
        &self,
        transport: TcpTransport,
        control: &mut watch::Receiver<SessionSignal>,
        buffer: &mut BytesMut,
    ) -> LinkEnd {
        let peer = transport.peer_addr();
        if let Ok(local) = transport.local_addr() {
            self.shared
                .trace(format_args!("local address {} for {}", local, peer));
        }
        let (mut reader, writer) = transport.into_split();
        *self.shared.writer.lock().await = Some(WriterSlot {
            generation: self.generation,
            writer: Box::new(writer),
        });

        if !self.shared.transition(self.generation, ConnectionState::Connected) {
            self.shared.close_writer(Some(self.generation)).await;
            return LinkEnd::Stopped;
        }
        log::info!("Connected to {} ({})", self.endpoint, peer);
        self.shared.emit(ClientEvent::ConnectedFb(LINK_UP));
        self.shared.report_status(self.generation, SocketStatus::Connected);

        let (status, error) = tokio::select! {
            biased;
            signal = next_signal(control) => {
                // DataTransmit already moved the client to Error and
                // dropped the write half.
                if signal == SessionSignal::WriteFailed {
                    return LinkEnd::Failed;
                }
                self.shared.close_writer(Some(self.generation)).await;
                return LinkEnd::Stopped;
            }
            end = self.receive_loop(&mut reader, buffer) => end,
        };

        if self.shared.enter_error(self.generation, status) {
            log::error!("Link to {} ended: {}", self.endpoint, error);
            self.shared.report_link_down(status, error.to_string());
        }
        self.shared.close_writer(Some(self.generation)).await;
        LinkEnd::Failed
    }

    /// Dispatch everything the peer sends until the link ends
    async fn receive_loop(
        &self,
        reader: &mut TcpReader,
        buffer: &mut BytesMut,
    ) -> (SocketStatus, ClientError) {
        let capacity = self.endpoint.buffer_size();
        loop {
            buffer.clear();
            buffer.resize(capacity, 0);
            match reader.read(&mut buffer[..]).await {
                Ok(0) => return (SocketStatus::BrokenRemotely, ClientError::ConnectionClosed),
                Ok(n) => {
                    let data = Bytes::copy_from_slice(&buffer[..n]);
                    self.shared.statistics.lock().record_receive(n);
                    self.shared.trace_bytes("rx", &data);
                    self.shared.emit(ClientEvent::DataReceived(data));
                }
                Err(e) => return (SocketStatus::LinkLost, e),
            }
        }
    }
}

/// Next control signal; a dropped sender counts as shutdown
async fn next_signal(control: &mut watch::Receiver<SessionSignal>) -> SessionSignal {
    loop {
        if control.changed().await.is_err() {
            return SessionSignal::Shutdown;
        }
        let signal = control.borrow_and_update().clone();
        if signal != SessionSignal::Run {
            return signal;
        }
    }
}

/// Resolve once a shutdown is requested, skipping stale transmit failures
async fn wait_for_shutdown(control: &mut watch::Receiver<SessionSignal>) {
    while next_signal(control).await != SessionSignal::Shutdown {}
}
