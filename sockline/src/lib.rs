//! sockline - callback-driven TCP client
//!
//! A single outbound TCP connection for control-system hosts: the host
//! initializes an endpoint, connects, transmits bytes and is told about
//! received data, connection state and errors through callbacks.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `sockline-core`: Errors, endpoint validation, state machine, status table, configuration
//! - `sockline-transport`: Byte-stream traits, TCP transport, endpoint resolution
//! - `sockline-client`: The [`TcpClient`] component and its event callbacks
//!
//! # Usage
//!
//! ```no_run
//! use sockline::TcpClient;
//!
//! # async fn run() -> sockline::ClientResult<()> {
//! let client = TcpClient::new();
//! client.on_connection_status(|name, link| println!("{} ({})", name, link));
//! client.initialize("projector.local", 4352, 512)?;
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use sockline_core::{
    ClientConfig, ClientError, ClientResult, ClientStatistics, ConnectionState, Endpoint,
    ErrorKind, SocketStatus,
};

// Re-export client API
pub use sockline_client::{
    Callbacks, ChannelEventListener, ClientEvent, ClientEventListener, TcpClient,
};

// Re-export transport layer
pub mod transport {
    pub use sockline_transport::*;
}
