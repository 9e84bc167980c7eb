//! Callback-driven TCP client
//!
//! This crate provides [`TcpClient`], a single outbound TCP connection that
//! reports its lifecycle to a host through five event categories:
//! ReceiveData, ConnectedFbStatus, ConnectionStatus, InitializedStatus and
//! ErrorStatus.
//!
//! Handshake, receive loop and optional reconnect run on a tokio task; see
//! [`client`] for the lifecycle and [`events`] for callback registration.

pub mod client;
pub mod events;

mod session;
mod shared;

pub use client::TcpClient;
pub use events::{Callbacks, ChannelEventListener, ClientEvent, ClientEventListener};
pub use sockline_core::{
    ClientConfig, ClientError, ClientResult, ClientStatistics, ConnectionState, Endpoint,
    ErrorKind, SocketStatus,
};
