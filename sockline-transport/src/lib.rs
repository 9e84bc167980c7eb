//! Transport layer for the sockline TCP client
//!
//! This crate provides the byte-stream traits the client works against, the
//! TCP transport that implements them and endpoint resolution.

pub mod resolve;
pub mod stream;
pub mod tcp;

pub use resolve::{Resolution, needs_lookup, resolve};
pub use stream::{IoReader, IoWriter, StreamReader, StreamWriter};
pub use tcp::{TcpReader, TcpSettings, TcpTransport, TcpWriter};
