//! TCP transport implementation

use crate::stream::{IoReader, IoWriter};
use sockline_core::{ClientConfig, ClientError, ClientResult};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Read half of a connected TCP transport
pub type TcpReader = IoReader<OwnedReadHalf>;
/// Write half of a connected TCP transport
pub type TcpWriter = IoWriter<OwnedWriteHalf>;

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    /// Bound on the handshake; `None` waits for the OS timeout
    pub connect_timeout: Option<Duration>,
    /// Bound on each write
    pub write_timeout: Option<Duration>,
    /// Set TCP_NODELAY after connecting
    pub nodelay: bool,
}

impl TcpSettings {
    /// Create new TCP settings with a 30 second handshake and write timeout
    pub fn new() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(30)),
            write_timeout: Some(Duration::from_secs(30)),
            nodelay: true,
        }
    }

}

impl From<&ClientConfig> for TcpSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: Some(config.connect_timeout),
            write_timeout: Some(config.write_timeout),
            nodelay: config.nodelay,
        }
    }
}

impl Default for TcpSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Connected TCP transport
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    settings: TcpSettings,
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.peer)
            .field("settings", &self.settings)
            .finish()
    }
}

impl TcpTransport {
    /// Open a connection to `address`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] if the handshake exceeds the connect
    /// timeout, [`ClientError::Connection`] if it is refused or fails
    pub async fn connect(address: SocketAddr, settings: TcpSettings) -> ClientResult<Self> {
        let stream = if let Some(timeout) = settings.connect_timeout {
            tokio::time::timeout(timeout, TcpStream::connect(address))
                .await
                .map_err(|_| ClientError::Timeout)?
                .map_err(ClientError::Connection)?
        } else {
            TcpStream::connect(address)
                .await
                .map_err(ClientError::Connection)?
        };

        Self::from_connected_stream(stream, settings)
    }

    /// Try each address in order and keep the first connection that succeeds
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, or a validation error if
    /// `addresses` is empty
    pub async fn connect_any(addresses: &[SocketAddr], settings: TcpSettings) -> ClientResult<Self> {
        let mut last_error = None;
        for address in addresses {
            match Self::connect(*address, settings.clone()).await {
                Ok(transport) => return Ok(transport),
                Err(e) => {
                    log::debug!("Connect to {} failed: {}", address, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            ClientError::Validation("No address to connect to".to_string())
        }))
    }

    /// Create a transport from an already-connected stream
    pub fn from_connected_stream(stream: TcpStream, settings: TcpSettings) -> ClientResult<Self> {
        if settings.nodelay {
            stream.set_nodelay(true).map_err(ClientError::Connection)?;
        }
        let peer = stream.peer_addr().map_err(ClientError::Connection)?;
        Ok(Self {
            stream,
            peer,
            settings,
        })
    }

    /// Address of the remote peer
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of the socket
    pub fn local_addr(&self) -> ClientResult<SocketAddr> {
        self.stream.local_addr().map_err(ClientError::Connection)
    }

    /// Split into independently owned read and write halves
    ///
    /// Reads are not time-bounded: the receive loop waits until data arrives,
    /// the peer closes, or the client cancels it.
    pub fn into_split(self) -> (TcpReader, TcpWriter) {
        let (read, write) = self.stream.into_split();
        (
            IoReader::new(read, None),
            IoWriter::new(write, self.settings.write_timeout),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{StreamReader, StreamWriter};
    use sockline_core::ErrorKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_tcp_settings() {
        let settings = TcpSettings::new();
        assert!(settings.connect_timeout.is_some());
        assert!(settings.nodelay);

        let config = ClientConfig::new()
            .with_connect_timeout(Duration::from_millis(100))
            .with_write_timeout(Duration::from_millis(200))
            .with_nodelay(false);
        let settings = TcpSettings::from(&config);
        assert_eq!(settings.connect_timeout, Some(Duration::from_millis(100)));
        assert_eq!(settings.write_timeout, Some(Duration::from_millis(200)));
        assert!(!settings.nodelay);
    }

    #[tokio::test]
    async fn test_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let transport = TcpTransport::connect(address, TcpSettings::new()).await.unwrap();
        assert_eq!(transport.peer_addr(), address);
        let (mut peer, _) = listener.accept().await.unwrap();

        let (mut reader, mut writer) = transport.into_split();
        writer.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        peer.write_all(b"pong").await.unwrap();
        let mut received = Vec::new();
        while received.len() < 4 {
            let mut chunk = [0u8; 16];
            let n = reader.read(&mut chunk).await.unwrap();
            received.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(received, b"pong");

        drop(peer);
        let mut chunk = [0u8; 16];
        assert_eq!(reader.read(&mut chunk).await.unwrap(), 0);
        assert!(reader.is_closed());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let err = TcpTransport::connect(address, TcpSettings::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_connect_any_without_addresses() {
        let err = TcpTransport::connect_any(&[], TcpSettings::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
