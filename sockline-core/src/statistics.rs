//! Client statistics collection

/// Client connection statistics
///
/// Counters accumulate over the lifetime of a client instance, across
/// reconnects. They are updated by the client and its background worker;
/// hosts read a snapshot through `TcpClient::statistics`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStatistics {
    /// Total payload bytes written to the socket
    pub bytes_sent: u64,
    /// Total bytes read from the socket
    pub bytes_received: u64,
    /// Completed DataTransmit calls
    pub transmits: u64,
    /// ReceiveData dispatches
    pub receives: u64,
    /// Handshakes started, including automatic retries
    pub connect_attempts: u64,
    /// Handshakes that failed
    pub connect_failures: u64,
    /// Handshakes started by the reconnect timer
    pub reconnect_attempts: u64,
    /// Errors reported through ErrorStatus
    pub errors: u64,
    /// Explicit disconnects
    pub disconnects: u64,
}

impl ClientStatistics {
    /// Create new statistics with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all statistics counters
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Record a completed transmit of `bytes` bytes
    pub fn record_transmit(&mut self, bytes: usize) {
        self.transmits += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record a receive of `bytes` bytes
    pub fn record_receive(&mut self, bytes: usize) {
        self.receives += 1;
        self.bytes_received += bytes as u64;
    }

    /// Increment connect attempt counter
    pub fn increment_connect_attempts(&mut self) {
        self.connect_attempts += 1;
    }

    /// Increment connect failure counter
    pub fn increment_connect_failures(&mut self) {
        self.connect_failures += 1;
    }

    /// Increment reconnect attempt counter
    pub fn increment_reconnect_attempts(&mut self) {
        self.reconnect_attempts += 1;
    }

    /// Increment error counter
    pub fn increment_errors(&mut self) {
        self.errors += 1;
    }

    /// Increment disconnect counter
    pub fn increment_disconnects(&mut self) {
        self.disconnects += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_traffic() {
        let mut stats = ClientStatistics::new();
        stats.record_transmit(5);
        stats.record_transmit(7);
        stats.record_receive(3);
        assert_eq!(stats.transmits, 2);
        assert_eq!(stats.bytes_sent, 12);
        assert_eq!(stats.receives, 1);
        assert_eq!(stats.bytes_received, 3);
    }

    #[test]
    fn test_connect_counters_and_clear() {
        let mut stats = ClientStatistics::new();
        stats.increment_connect_attempts();
        stats.increment_connect_attempts();
        stats.increment_connect_failures();
        assert_eq!(stats.connect_attempts, 2);
        assert_eq!(stats.connect_failures, 1);
        stats.clear();
        assert_eq!(stats, ClientStatistics::default());
    }
}
