//! State shared between a client handle and its background session

use crate::events::{Callbacks, ClientEvent};
use bytes::BytesMut;
use parking_lot::{Mutex, RwLock};
use sockline_core::{
    ClientConfig, ClientStatistics, ConnectionState, Endpoint, LINK_DOWN, SocketStatus,
};
use sockline_transport::StreamWriter;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Control signal from the client handle to a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionSignal {
    Run,
    /// Stop immediately (disconnect, re-initialize, new connect, drop)
    Shutdown,
    /// A transmit failed; the client already moved to Error
    WriteFailed,
}

/// Write half installed by the session that opened it
pub(crate) struct WriterSlot {
    pub generation: u64,
    pub writer: Box<dyn StreamWriter>,
}

/// Mutable client state, guarded by a single short-lived lock
#[derive(Default)]
pub(crate) struct Core {
    pub state: ConnectionState,
    pub socket_status: SocketStatus,
    pub endpoint: Option<Endpoint>,
    /// `None` while lent to a running session
    pub receive_buffer: Option<BytesMut>,
    /// Bumped whenever a session is started or superseded
    pub generation: u64,
    pub control: Option<watch::Sender<SessionSignal>>,
    pub worker: Option<JoinHandle<()>>,
}

impl Core {
    /// Supersede the running session, if any
    pub fn stop_session(&mut self) -> Option<JoinHandle<()>> {
        self.generation += 1;
        if let Some(control) = self.control.take() {
            let _ = control.send(SessionSignal::Shutdown);
        }
        self.worker.take()
    }
}

pub(crate) struct Shared {
    pub id: u64,
    pub config: ClientConfig,
    pub core: Mutex<Core>,
    pub callbacks: RwLock<Callbacks>,
    pub writer: tokio::sync::Mutex<Option<WriterSlot>>,
    pub statistics: Mutex<ClientStatistics>,
    debug: AtomicBool,
}

impl Shared {
    pub fn new(id: u64, config: ClientConfig) -> Self {
        Self {
            id,
            config,
            core: Mutex::new(Core::default()),
            callbacks: RwLock::new(Callbacks::new()),
            writer: tokio::sync::Mutex::new(None),
            statistics: Mutex::new(ClientStatistics::new()),
            debug: AtomicBool::new(false),
        }
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Verbose log line, only emitted while debug is enabled
    pub fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.is_debug() {
            log::debug!("[client {}] {}", self.id, message);
        }
    }

    /// Hex dump of raw bytes, only emitted while debug is enabled
    pub fn trace_bytes(&self, direction: &str, bytes: &[u8]) {
        if self.is_debug() {
            log::debug!(
                "[client {}] {} {} bytes: {}",
                self.id,
                direction,
                bytes.len(),
                hex::encode_upper(bytes)
            );
        }
    }

    /// Deliver an event to the registered handler
    ///
    /// The registry is cloned first so no lock is held while handlers run.
    pub fn emit(&self, event: ClientEvent) {
        if let ClientEvent::Error(message) = &event {
            self.statistics.lock().increment_errors();
            log::warn!("[client {}] {}", self.id, message);
        }
        if self.is_debug() {
            log::debug!("[client {}] event: {}", self.id, event.description());
        }
        let callbacks = self.callbacks.read().clone();
        callbacks.dispatch(&event);
    }

    /// Move to `to` if `generation` is still current and the transition is
    /// allowed from the present state
    pub fn transition(&self, generation: u64, to: ConnectionState) -> bool {
        let from = {
            let mut core = self.core.lock();
            if core.generation != generation {
                return false;
            }
            let from = core.state;
            if let Err(e) = from.validate_transition(to) {
                self.trace(format_args!("{}", e));
                return false;
            }
            core.state = to;
            from
        };
        self.trace(format_args!("state {} -> {}", from, to));
        true
    }

    /// Move a live link (Connecting or Connected) to Error
    ///
    /// Returns `false` if another path already failed or closed the link, so
    /// failure events are emitted exactly once per link.
    pub fn enter_error(&self, generation: u64, status: SocketStatus) -> bool {
        let from = {
            let mut core = self.core.lock();
            if core.generation != generation
                || !matches!(
                    core.state,
                    ConnectionState::Connecting | ConnectionState::Connected
                )
            {
                return false;
            }
            let from = core.state;
            core.state = ConnectionState::Error;
            core.socket_status = status;
            from
        };
        self.trace(format_args!("state {} -> Error ({})", from, status));
        true
    }

    /// Announce a link that went down after [`Shared::enter_error`] succeeded
    ///
    /// Every failure path reports in the same order: ConnectedFbStatus(0),
    /// ConnectionStatus, then ErrorStatus.
    pub fn report_link_down(&self, status: SocketStatus, message: String) {
        self.emit(ClientEvent::ConnectedFb(LINK_DOWN));
        self.emit(ClientEvent::ConnectionStatus(status));
        self.emit(ClientEvent::Error(message));
    }

    /// Record and announce a socket status for the current session
    pub fn report_status(&self, generation: u64, status: SocketStatus) {
        {
            let mut core = self.core.lock();
            if core.generation != generation {
                return;
            }
            core.socket_status = status;
        }
        self.emit(ClientEvent::ConnectionStatus(status));
    }

    /// Take back a receive buffer lent to a session, keeping its capacity
    pub fn return_buffer(&self, mut buffer: BytesMut) {
        buffer.clear();
        let mut core = self.core.lock();
        // A re-initialize may already have allocated a new buffer.
        if core.receive_buffer.is_none() && core.endpoint.is_some() {
            core.receive_buffer = Some(buffer);
        }
    }

    /// Remove and shut down the write half if it belongs to `generation`
    pub async fn close_writer(&self, generation: Option<u64>) {
        let slot = {
            let mut guard = self.writer.lock().await;
            let stale = matches!(
                (guard.as_ref(), generation),
                (Some(slot), Some(generation)) if slot.generation != generation
            );
            if stale { None } else { guard.take() }
        };
        if let Some(mut slot) = slot {
            let _ = slot.writer.close().await;
        }
    }
}
