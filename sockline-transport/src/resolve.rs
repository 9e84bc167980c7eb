//! Endpoint resolution

use sockline_core::{ClientError, ClientResult, Endpoint};
use std::net::SocketAddr;
use std::time::Duration;

/// Outcome of resolving an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The host was an IP literal; no lookup was performed
    Literal(SocketAddr),
    /// The host name resolved to these addresses, in resolver order
    Resolved(Vec<SocketAddr>),
}

impl Resolution {
    /// Addresses to try, in order
    pub fn addresses(&self) -> &[SocketAddr] {
        match self {
            Resolution::Literal(address) => std::slice::from_ref(address),
            Resolution::Resolved(addresses) => addresses,
        }
    }

    /// Check if a DNS lookup was involved
    pub fn is_lookup(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Check if resolving `endpoint` needs a DNS lookup
pub fn needs_lookup(endpoint: &Endpoint) -> bool {
    endpoint.ip().is_none()
}

/// Resolve an endpoint to socket addresses
///
/// # Errors
///
/// Returns [`ClientError::Dns`] if the lookup fails, times out or yields no
/// address
pub async fn resolve(endpoint: &Endpoint, timeout: Duration) -> ClientResult<Resolution> {
    if let Some(ip) = endpoint.ip() {
        return Ok(Resolution::Literal(SocketAddr::new(ip, endpoint.port())));
    }

    let lookup = tokio::net::lookup_host((endpoint.host(), endpoint.port()));
    let addresses: Vec<SocketAddr> = tokio::time::timeout(timeout, lookup)
        .await
        .map_err(|_| ClientError::Dns(format!("Lookup of {} timed out", endpoint.host())))?
        .map_err(|e| ClientError::Dns(format!("{}: {}", endpoint.host(), e)))?
        .collect();

    if addresses.is_empty() {
        return Err(ClientError::Dns(format!(
            "{} resolved to no addresses",
            endpoint.host()
        )));
    }
    Ok(Resolution::Resolved(addresses))
}
