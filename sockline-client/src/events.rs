//! Client events and callback registration
//!
//! A client reports five event categories to its host: received data, the
//! connected feedback flag, detailed connection status, the initialization
//! result and error messages. Hosts register at most one handler per
//! category; registering again replaces the previous handler, and events
//! without a handler are dropped.

use bytes::Bytes;
use sockline_core::SocketStatus;
use std::fmt;
use std::sync::Arc;

/// An event emitted by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Bytes read from the socket, in arrival order
    DataReceived(Bytes),

    /// Connected feedback: 1 when connected, 0 otherwise
    ConnectedFb(u16),

    /// Socket status change
    ///
    /// Hosts see it as the `(name, link)` pair returned by
    /// [`SocketStatus::as_str`] and [`SocketStatus::link`].
    ConnectionStatus(SocketStatus),

    /// Initialization result: 1 on success, 0 on failure
    Initialized(u16),

    /// Error message
    Error(String),
}

impl ClientEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            Self::DataReceived(data) => format!("Received {} bytes", data.len()),
            Self::ConnectedFb(status) => format!("Connected feedback {}", status),
            Self::ConnectionStatus(status) => {
                format!("Connection status {} ({})", status, status.link())
            }
            Self::Initialized(status) => format!("Initialized status {}", status),
            Self::Error(message) => format!("Error: {}", message),
        }
    }
}

/// Observer for client events
///
/// One method per event category, each with an empty default body, so an
/// implementor only overrides what it consumes. Methods run on the client's
/// background task and must return quickly; offload heavy work.
pub trait ClientEventListener: Send + Sync {
    /// Bytes were received
    fn receive_data(&self, _data: &[u8]) {}

    /// Connected feedback changed or was re-signalled
    fn connected_fb_status(&self, _status: u16) {}

    /// Socket status changed
    fn connection_status(&self, _status: SocketStatus) {}

    /// Initialize completed
    fn initialized_status(&self, _status: u16) {}

    /// An error occurred
    fn error_status(&self, _error: &str) {}
}

type DataHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;
type FlagHandler = Arc<dyn Fn(u16) + Send + Sync>;
type StatusHandler = Arc<dyn Fn(SocketStatus) + Send + Sync>;
type TextHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback registry with one optional slot per event category
///
/// Cloning is cheap: handlers are reference counted. The client clones the
/// registry before dispatching so handlers may re-register while running.
#[derive(Clone, Default)]
pub struct Callbacks {
    receive_data: Option<DataHandler>,
    connected_fb_status: Option<FlagHandler>,
    connection_status: Option<StatusHandler>,
    initialized_status: Option<FlagHandler>,
    error_status: Option<TextHandler>,
}

impl Callbacks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the ReceiveData handler
    pub fn set_receive_data<F>(&mut self, handler: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.receive_data = Some(Arc::new(handler));
    }

    /// Register the ConnectedFbStatus handler
    pub fn set_connected_fb_status<F>(&mut self, handler: F)
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.connected_fb_status = Some(Arc::new(handler));
    }

    /// Register the ConnectionStatus handler
    ///
    /// The handler receives the status name and the link flag, e.g.
    /// `("Connected", 1)` or `("Broken Remotely", 0)`.
    pub fn set_connection_status<F>(&mut self, handler: F)
    where
        F: Fn(&str, u16) + Send + Sync + 'static,
    {
        self.connection_status = Some(Arc::new(move |status: SocketStatus| {
            handler(status.as_str(), status.link())
        }));
    }

    /// Register the InitializedStatus handler
    pub fn set_initialized_status<F>(&mut self, handler: F)
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.initialized_status = Some(Arc::new(handler));
    }

    /// Register the ErrorStatus handler
    pub fn set_error_status<F>(&mut self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.error_status = Some(Arc::new(handler));
    }

    /// Route all five categories to `listener`, replacing existing handlers
    pub fn set_listener(&mut self, listener: Arc<dyn ClientEventListener>) {
        let l = listener.clone();
        self.receive_data = Some(Arc::new(move |data: &[u8]| l.receive_data(data)));
        let l = listener.clone();
        self.connected_fb_status = Some(Arc::new(move |status| l.connected_fb_status(status)));
        let l = listener.clone();
        self.connection_status = Some(Arc::new(move |status| l.connection_status(status)));
        let l = listener.clone();
        self.initialized_status = Some(Arc::new(move |status| l.initialized_status(status)));
        let l = listener;
        self.error_status = Some(Arc::new(move |error: &str| l.error_status(error)));
    }

    /// Remove every handler
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Deliver an event to the handler of its category, if any
    pub fn dispatch(&self, event: &ClientEvent) {
        match event {
            ClientEvent::DataReceived(data) => {
                if let Some(handler) = &self.receive_data {
                    handler(data);
                }
            }
            ClientEvent::ConnectedFb(status) => {
                if let Some(handler) = &self.connected_fb_status {
                    handler(*status);
                }
            }
            ClientEvent::ConnectionStatus(status) => {
                if let Some(handler) = &self.connection_status {
                    handler(*status);
                }
            }
            ClientEvent::Initialized(status) => {
                if let Some(handler) = &self.initialized_status {
                    handler(*status);
                }
            }
            ClientEvent::Error(message) => {
                if let Some(handler) = &self.error_status {
                    handler(message);
                }
            }
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("receive_data", &self.receive_data.is_some())
            .field("connected_fb_status", &self.connected_fb_status.is_some())
            .field("connection_status", &self.connection_status.is_some())
            .field("initialized_status", &self.initialized_status.is_some())
            .field("error_status", &self.error_status.is_some())
            .finish()
    }
}

/// Channel-based event listener
///
/// Forwards every event to a tokio unbounded channel, so a host can consume
/// events on its own task instead of on the client's background task.
pub struct ChannelEventListener {
    tx: tokio::sync::mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelEventListener {
    /// Create a new channel-based event listener
    ///
    /// # Returns
    /// Returns the listener and a receiver for events.
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: ClientEvent) {
        // The receiver may have been dropped; events are then discarded.
        let _ = self.tx.send(event);
    }
}

impl ClientEventListener for ChannelEventListener {
    fn receive_data(&self, data: &[u8]) {
        self.forward(ClientEvent::DataReceived(Bytes::copy_from_slice(data)));
    }

    fn connected_fb_status(&self, status: u16) {
        self.forward(ClientEvent::ConnectedFb(status));
    }

    fn connection_status(&self, status: SocketStatus) {
        self.forward(ClientEvent::ConnectionStatus(status));
    }

    fn initialized_status(&self, status: u16) {
        self.forward(ClientEvent::Initialized(status));
    }

    fn error_status(&self, error: &str) {
        self.forward(ClientEvent::Error(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_event_description() {
        let event = ClientEvent::ConnectionStatus(SocketStatus::Connected);
        assert_eq!(event.description(), "Connection status Connected (1)");
    }

    #[test]
    fn test_missing_handler_drops_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut callbacks = Callbacks::new();
        callbacks.dispatch(&ClientEvent::Error("ignored".to_string()));

        let sink = seen.clone();
        callbacks.set_initialized_status(move |s| sink.lock().push(s));
        callbacks.dispatch(&ClientEvent::Error("still ignored".to_string()));
        callbacks.dispatch(&ClientEvent::Initialized(1));
        assert_eq!(*seen.lock(), vec![1]);

        callbacks.clear();
        callbacks.dispatch(&ClientEvent::Initialized(0));
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn test_reregistration_replaces_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut callbacks = Callbacks::new();

        let first = seen.clone();
        callbacks.set_error_status(move |e| first.lock().push(format!("first:{}", e)));
        let second = seen.clone();
        callbacks.set_error_status(move |e| second.lock().push(format!("second:{}", e)));

        callbacks.dispatch(&ClientEvent::Error("x".to_string()));
        assert_eq!(*seen.lock(), vec!["second:x".to_string()]);
    }

    #[test]
    fn test_connection_status_pair() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut callbacks = Callbacks::new();
        let sink = seen.clone();
        callbacks.set_connection_status(move |name, link| sink.lock().push((name.to_string(), link)));

        callbacks.dispatch(&ClientEvent::ConnectionStatus(SocketStatus::Connected));
        callbacks.dispatch(&ClientEvent::ConnectionStatus(SocketStatus::LinkLost));
        assert_eq!(
            *seen.lock(),
            vec![("Connected".to_string(), 1), ("Link Lost".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_channel_listener() {
        let (listener, mut rx) = ChannelEventListener::new();
        let mut callbacks = Callbacks::new();
        callbacks.set_listener(Arc::new(listener));

        callbacks.dispatch(&ClientEvent::Initialized(1));
        callbacks.dispatch(&ClientEvent::DataReceived(Bytes::from_static(b"abc")));

        assert_eq!(rx.recv().await.unwrap(), ClientEvent::Initialized(1));
        assert_eq!(
            rx.recv().await.unwrap(),
            ClientEvent::DataReceived(Bytes::from_static(b"abc"))
        );
    }
}
