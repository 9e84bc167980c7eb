//! Stream reader/writer traits for the transport layer
//!
//! A connected transport is split into a read half, owned by the background
//! receive loop, and a write half, shared by DataTransmit callers. The traits
//! keep the client independent of the concrete socket type.

use async_trait::async_trait;
use sockline_core::{ClientError, ClientResult};
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read half of a byte stream
#[async_trait]
pub trait StreamReader: Send {
    /// Read data from the stream
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if the peer closed the stream
    async fn read(&mut self, buf: &mut [u8]) -> ClientResult<usize>;

    /// Check if the stream reached EOF or failed
    fn is_closed(&self) -> bool;
}

/// Write half of a byte stream
#[async_trait]
pub trait StreamWriter: Send {
    /// Write data to the stream
    ///
    /// # Returns
    ///
    /// Number of bytes written, possibly fewer than `buf.len()`
    async fn write(&mut self, buf: &[u8]) -> ClientResult<usize>;

    /// Write all data to the stream, retrying partial writes
    ///
    /// # Errors
    ///
    /// Returns the first write error, or [`ClientError::Transmit`] if the
    /// stream stops accepting bytes
    async fn write_all(&mut self, buf: &[u8]) -> ClientResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(ClientError::Transmit(format!(
                    "Stream accepted no data after {} of {} bytes",
                    written,
                    buf.len()
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> ClientResult<()>;

    /// Check if the stream failed or was closed
    fn is_closed(&self) -> bool;

    /// Shut the stream down
    async fn close(&mut self) -> ClientResult<()>;
}

/// [`StreamReader`] over any tokio reader
pub struct IoReader<R> {
    inner: R,
    timeout: Option<Duration>,
    closed: bool,
}

impl<R> IoReader<R> {
    /// Wrap a reader; `timeout` bounds each read, `None` waits indefinitely
    pub fn new(inner: R, timeout: Option<Duration>) -> Self {
        Self {
            inner,
            timeout,
            closed: false,
        }
    }
}

impl<R> fmt::Debug for IoReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoReader")
            .field("timeout", &self.timeout)
            .field("closed", &self.closed)
            .finish()
    }
}

#[async_trait]
impl<R> StreamReader for IoReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8]) -> ClientResult<usize> {
        let result = if let Some(timeout) = self.timeout {
            tokio::time::timeout(timeout, self.inner.read(buf))
                .await
                .map_err(|_| ClientError::Timeout)?
                .map_err(ClientError::Connection)
        } else {
            self.inner.read(buf).await.map_err(ClientError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// [`StreamWriter`] over any tokio writer
pub struct IoWriter<W> {
    inner: W,
    timeout: Option<Duration>,
    closed: bool,
}

impl<W> IoWriter<W> {
    /// Wrap a writer; `timeout` bounds each write, `None` waits indefinitely
    pub fn new(inner: W, timeout: Option<Duration>) -> Self {
        Self {
            inner,
            timeout,
            closed: false,
        }
    }
}

impl<W> fmt::Debug for IoWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoWriter")
            .field("timeout", &self.timeout)
            .field("closed", &self.closed)
            .finish()
    }
}

#[async_trait]
impl<W> StreamWriter for IoWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, buf: &[u8]) -> ClientResult<usize> {
        if self.closed {
            return Err(ClientError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Stream already closed",
            )));
        }

        let result = if let Some(timeout) = self.timeout {
            tokio::time::timeout(timeout, self.inner.write(buf))
                .await
                .map_err(|_| ClientError::Timeout)
                .and_then(|r| r.map_err(ClientError::Connection))
        } else {
            self.inner.write(buf).await.map_err(ClientError::Connection)
        };

        if result.is_err() {
            self.closed = true;
        }
        result
    }

    async fn flush(&mut self) -> ClientResult<()> {
        self.inner.flush().await.map_err(ClientError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> ClientResult<()> {
        if !self.closed {
            self.closed = true;
            let _ = self.inner.shutdown().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sockline_core::ErrorKind;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_write_all_retries_partial_writes() {
        // The mock accepts at most one expected chunk per write call.
        let mock = Builder::new().write(b"hel").write(b"lo ").write(b"world").build();
        let mut writer = IoWriter::new(mock, None);
        writer.write_all(b"hello world").await.unwrap();
        assert!(!writer.is_closed());
    }

    #[tokio::test]
    async fn test_write_error_closes_writer() {
        let mock = Builder::new()
            .write(b"ab")
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"))
            .build();
        let mut writer = IoWriter::new(mock, None);
        let err = writer.write_all(b"abcd").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(writer.is_closed());
        assert!(writer.write(b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_reader_reports_eof() {
        let mock = Builder::new().read(b"abc").build();
        let mut reader = IoReader::new(mock, None);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert!(!reader.is_closed());
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
        assert!(reader.is_closed());
    }

    #[tokio::test]
    async fn test_reader_error_closes_reader() {
        let mock = Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut reader = IoReader::new(mock, None);
        let mut buf = [0u8; 8];
        assert!(reader.read(&mut buf).await.is_err());
        assert!(reader.is_closed());
    }
}
