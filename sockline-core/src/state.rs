//! Client connection state machine

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// TCP client connection state
///
/// Tracks the lifecycle of the single connection owned by a client so that
/// operations are only performed when the connection is in the right state.
///
/// # State Transitions
/// ```text
/// Uninitialized -> Initialized   (initialize)
/// Initialized   -> Connecting    (connect)
/// Connecting    -> Connected     (handshake ok)
/// Connecting    -> Error         (timeout, refusal, DNS failure)
/// Connected     -> Error         (peer close, read or write failure)
/// Connected     -> Disconnected  (disconnect)
/// Disconnected  -> Connecting    (connect)
/// Error         -> Connecting    (connect, or automatic reconnect)
/// Error         -> Disconnected  (disconnect)
/// ```
///
/// `Initialized`, `Disconnected` and `Error` may also go back to
/// `Initialized` through a new `initialize` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No endpoint configured yet (initial state)
    #[default]
    Uninitialized,
    /// Endpoint validated and receive buffer allocated, no socket open
    Initialized,
    /// Handshake in progress on the background worker
    Connecting,
    /// Socket open, receive loop running
    Connected,
    /// Closed on request
    Disconnected,
    /// Last connect attempt or I/O operation failed
    Error,
}

impl ConnectionState {
    /// Check if data can be sent or received
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if a connect attempt may start from this state
    pub fn can_connect(&self) -> bool {
        matches!(
            self,
            ConnectionState::Initialized | ConnectionState::Disconnected | ConnectionState::Error
        )
    }

    /// Check if a disconnect has anything to tear down
    pub fn can_disconnect(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Error
        )
    }

    /// Check if the endpoint may be (re)configured
    pub fn can_initialize(&self) -> bool {
        !matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// Validate state transition
    ///
    /// # Returns
    /// `Ok(())` if the transition is part of the state machine, a
    /// [`ClientError::Validation`] otherwise
    pub fn validate_transition(&self, new_state: ConnectionState) -> ClientResult<()> {
        use ConnectionState::*;

        let valid = match (*self, new_state) {
            (current, Initialized) => current.can_initialize(),
            (Initialized | Disconnected | Error, Connecting) => true,
            (Connecting, Connected | Error | Disconnected) => true,
            (Connected, Error | Disconnected) => true,
            (Error, Disconnected) => true,
            // Self-transitions (re-signalling)
            (Connected, Connected) | (Disconnected, Disconnected) | (Error, Error) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(ClientError::Validation(format!(
                "Invalid state transition: {:?} -> {:?}",
                self, new_state
            )))
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "Uninitialized",
            ConnectionState::Initialized => "Initialized",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Error => "Error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn test_default_is_uninitialized() {
        assert_eq!(ConnectionState::default(), Uninitialized);
    }

    #[test]
    fn test_happy_path_transitions() {
        assert!(Uninitialized.validate_transition(Initialized).is_ok());
        assert!(Initialized.validate_transition(Connecting).is_ok());
        assert!(Connecting.validate_transition(Connected).is_ok());
        assert!(Connected.validate_transition(Disconnected).is_ok());
        assert!(Disconnected.validate_transition(Connecting).is_ok());
    }

    #[test]
    fn test_failure_transitions() {
        assert!(Connecting.validate_transition(Error).is_ok());
        assert!(Connected.validate_transition(Error).is_ok());
        assert!(Error.validate_transition(Connecting).is_ok());
        assert!(Error.validate_transition(Disconnected).is_ok());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(Uninitialized.validate_transition(Connecting).is_err());
        assert!(Uninitialized.validate_transition(Connected).is_err());
        assert!(Initialized.validate_transition(Connected).is_err());
        assert!(Connected.validate_transition(Initialized).is_err());
        assert!(Connecting.validate_transition(Initialized).is_err());
        assert!(Disconnected.validate_transition(Connected).is_err());
    }

    #[test]
    fn test_predicates() {
        assert!(Connected.is_connected());
        assert!(!Error.is_connected());
        assert!(!Uninitialized.can_connect());
        assert!(Error.can_connect());
        assert!(!Disconnected.can_disconnect());
        assert!(!Connected.can_initialize());
    }

    #[test]
    fn test_display() {
        assert_eq!(Connected.to_string(), "Connected");
        assert_eq!(Error.as_str(), "Error");
    }
}
