//! Socket status table reported through the ConnectionStatus callback

use serde::{Deserialize, Serialize};
use std::fmt;

/// Link flag for a connected socket
pub const LINK_UP: u16 = 1;
/// Link flag for any other socket status
pub const LINK_DOWN: u16 = 0;

/// Detailed socket status
///
/// Each status carries a fixed numeric code (see [`SocketStatus::code`]) so
/// hosts can route it to an analog signal, and a name for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SocketStatus {
    #[default]
    NoConnect,
    Waiting,
    Connected,
    ConnectFailed,
    BrokenRemotely,
    BrokenLocally,
    DnsLookup,
    DnsFailed,
    DnsResolved,
    LinkLost,
    SocketNotExist,
}

impl SocketStatus {
    /// Numeric status code
    pub fn code(&self) -> u16 {
        match self {
            SocketStatus::NoConnect => 0,
            SocketStatus::Waiting => 1,
            SocketStatus::Connected => 2,
            SocketStatus::ConnectFailed => 3,
            SocketStatus::BrokenRemotely => 4,
            SocketStatus::BrokenLocally => 5,
            SocketStatus::DnsLookup => 6,
            SocketStatus::DnsFailed => 7,
            SocketStatus::DnsResolved => 8,
            SocketStatus::LinkLost => 9,
            SocketStatus::SocketNotExist => 10,
        }
    }

    /// Link flag: [`LINK_UP`] only for [`SocketStatus::Connected`]
    pub fn link(&self) -> u16 {
        if matches!(self, SocketStatus::Connected) {
            LINK_UP
        } else {
            LINK_DOWN
        }
    }

    /// Get human-readable status name
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketStatus::NoConnect => "No Connect",
            SocketStatus::Waiting => "Waiting",
            SocketStatus::Connected => "Connected",
            SocketStatus::ConnectFailed => "Connect Failed",
            SocketStatus::BrokenRemotely => "Broken Remotely",
            SocketStatus::BrokenLocally => "Broken Locally",
            SocketStatus::DnsLookup => "DNS Lookup",
            SocketStatus::DnsFailed => "DNS Failed",
            SocketStatus::DnsResolved => "DNS Resolved",
            SocketStatus::LinkLost => "Link Lost",
            SocketStatus::SocketNotExist => "Socket Not Exist",
        }
    }
}

impl fmt::Display for SocketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
