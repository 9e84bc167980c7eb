//! Connection endpoint and its validation

use crate::error::{ClientError, ClientResult};
use std::fmt;
use std::net::IpAddr;

/// Remote endpoint of a client connection
///
/// Only obtainable through [`Endpoint::new`], so a held `Endpoint` always
/// satisfies the Initialize validation rules. Host names are not checked
/// here: a name that does not resolve is reported when connecting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
    buffer_size: usize,
}

impl Endpoint {
    /// Validate and build an endpoint
    ///
    /// # Arguments
    ///
    /// * `host` - IPv4/IPv6 literal (IPv6 may be bracketed) or host name;
    ///   surrounding whitespace is ignored
    /// * `port` - Remote port, must be in `1..=65535`
    /// * `buffer_size` - Receive buffer capacity in bytes, must be positive
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] naming the first offending parameter
    pub fn new(host: &str, port: u32, buffer_size: u32) -> ClientResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ClientError::Validation("Host must not be empty".to_string()));
        }

        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                ClientError::Validation(format!("Port must be in 1..=65535, got {}", port))
            })?;

        if buffer_size == 0 {
            return Err(ClientError::Validation(
                "Buffer size must be greater than zero".to_string(),
            ));
        }
        let buffer_size = usize::try_from(buffer_size).map_err(|_| {
            ClientError::Validation(format!("Buffer size {} is not addressable", buffer_size))
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
            buffer_size,
        })
    }

    /// Host as passed to [`Endpoint::new`], without surrounding whitespace
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Receive buffer capacity
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The host as an IP address, if it is a literal
    pub fn ip(&self) -> Option<IpAddr> {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
            .parse()
            .ok()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip() {
            Some(IpAddr::V6(_)) if !self.host.starts_with('[') => {
                write!(f, "[{}]:{}", self.host, self.port)
            }
            _ => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_endpoints() {
        let ep = Endpoint::new("192.168.1.10", 23, 1024).unwrap();
        assert_eq!(ep.host(), "192.168.1.10");
        assert_eq!(ep.port(), 23);
        assert_eq!(ep.buffer_size(), 1024);
        assert!(ep.ip().is_some());

        let ep = Endpoint::new("projector-1.av.local", 4352, 1).unwrap();
        assert!(ep.ip().is_none());
        assert_eq!(ep.to_string(), "projector-1.av.local:4352");

        let ep = Endpoint::new("[::1]", 65535, 512).unwrap();
        assert_eq!(ep.host(), "[::1]");
        assert!(ep.ip().is_some());
        assert_eq!(ep.to_string(), "[::1]:65535");
    }

    #[test]
    fn test_host_text_is_kept() {
        let ep = Endpoint::new("  0:0:0:0:0:0:0:1 ", 23, 64).unwrap();
        assert_eq!(ep.host(), "0:0:0:0:0:0:0:1");
        assert_eq!(ep.to_string(), "[0:0:0:0:0:0:0:1]:23");

        // Names are only checked by the resolver.
        let ep = Endpoint::new("my_host", 23, 64).unwrap();
        assert_eq!(ep.to_string(), "my_host:23");
        assert!(ep.ip().is_none());
        let ep = Endpoint::new("fe80::1%2", 23, 64).unwrap();
        assert_eq!(ep.host(), "fe80::1%2");
    }

    #[test]
    fn test_invalid_host() {
        assert!(Endpoint::new("", 23, 1024).is_err());
        assert!(Endpoint::new("   ", 23, 1024).is_err());
    }

    #[test]
    fn test_invalid_port() {
        assert!(Endpoint::new("10.0.0.1", 0, 1024).is_err());
        assert!(Endpoint::new("10.0.0.1", 65536, 1024).is_err());
        assert!(Endpoint::new("10.0.0.1", 1, 1024).is_ok());
    }

    #[test]
    fn test_buffer_size() {
        assert!(Endpoint::new("10.0.0.1", 23, 0).is_err());
        let ep = Endpoint::new("10.0.0.1", 23, 32 * 1024 * 1024).unwrap();
        assert_eq!(ep.buffer_size(), 32 * 1024 * 1024);
    }
}
