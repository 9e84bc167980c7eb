use crate::state::ConnectionState;
use thiserror::Error;

/// Main error type for sockline operations
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    #[error("Cannot {operation} while {state}")]
    State {
        operation: &'static str,
        state: ConnectionState,
    },

    #[error("not connected ({0})")]
    NotConnected(ConnectionState),

    #[error("Transmit error: {0}")]
    Transmit(String),

    #[error("Operation cancelled by disconnect")]
    Cancelled,
}

/// Coarse error category reported to hosts
///
/// Several [`ClientError`] variants collapse onto the same category: a peer
/// close, a refused handshake and a DNS failure are all connection errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad Initialize parameters
    Validation,
    /// Handshake failure, socket closed by peer, timeout
    Connection,
    /// Operation invoked in the wrong state
    State,
    /// Partial or failed write
    Transmit,
}

impl ClientError {
    /// Create a state error for `operation` attempted in `state`
    pub fn state(operation: &'static str, state: ConnectionState) -> Self {
        ClientError::State { operation, state }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Connection(_)
            | ClientError::ConnectionClosed
            | ClientError::Timeout
            | ClientError::Dns(_) => ErrorKind::Connection,
            ClientError::State { .. } | ClientError::NotConnected(_) => ErrorKind::State,
            ClientError::Transmit(_) | ClientError::Cancelled => ErrorKind::Transmit,
        }
    }
}

/// Result type alias for sockline operations
pub type ClientResult<T> = Result<T, ClientError>;
