//! Client configuration
//!
//! Timeouts and reconnect behaviour for a client instance. The endpoint itself
//! is not part of the configuration: hosts supply it through `initialize`.
//!
//! Durations are (de)serialized as whole milliseconds:
//!
//! ```json
//! { "connect_timeout_ms": 5000, "write_timeout_ms": 2000, "reconnect_interval_ms": 10000 }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on the TCP handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bound on a single DataTransmit
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);
/// Retry period used by hosts that enable automatic reconnect
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(10);

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bound on the TCP handshake (per resolved address)
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,
    /// Bound on a single DataTransmit
    #[serde(rename = "write_timeout_ms", with = "millis")]
    pub write_timeout: Duration,
    /// Retry period after a failed connect or a lost link; `None` disables
    /// automatic reconnect
    #[serde(rename = "reconnect_interval_ms", with = "optional_millis")]
    pub reconnect_interval: Option<Duration>,
    /// Set TCP_NODELAY on connected sockets
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            reconnect_interval: None,
            nodelay: true,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handshake timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the transmit timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable automatic reconnect with the given retry period
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = Some(interval);
        self
    }

    /// Enable automatic reconnect every [`DEFAULT_RECONNECT_INTERVAL`]
    pub fn with_auto_reconnect(self) -> Self {
        self.with_reconnect_interval(DEFAULT_RECONNECT_INTERVAL)
    }

    /// Set TCP_NODELAY
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
        assert!(config.reconnect_interval.is_none());
        assert!(config.nodelay);
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new()
            .with_connect_timeout(Duration::from_secs(2))
            .with_auto_reconnect()
            .with_nodelay(false);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.reconnect_interval, Some(DEFAULT_RECONNECT_INTERVAL));
        assert!(!config.nodelay);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "connect_timeout_ms": 1500, "reconnect_interval_ms": 10000 }"#)
                .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
        assert_eq!(config.reconnect_interval, Some(Duration::from_secs(10)));
        assert!(config.nodelay);
    }

    #[test]
    fn test_serialize_uses_milliseconds() {
        let json = serde_json::to_value(ClientConfig::default()).unwrap();
        assert_eq!(json["connect_timeout_ms"], 30_000);
        assert!(json["reconnect_interval_ms"].is_null());
    }
}
