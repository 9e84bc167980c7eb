//! Core types and utilities for the sockline TCP client
//!
//! This crate provides the fundamental types shared by the transport and
//! client crates: error handling, endpoint validation, the connection state
//! machine, the socket status table, statistics and client configuration.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod state;
pub mod statistics;
pub mod status;

pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_INTERVAL, DEFAULT_WRITE_TIMEOUT};
pub use endpoint::Endpoint;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use state::ConnectionState;
pub use statistics::ClientStatistics;
pub use status::{LINK_DOWN, LINK_UP, SocketStatus};
