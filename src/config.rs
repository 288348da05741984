//! Connector configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::header::HEADER_SIZE;
use crate::history::MessageHistory;

/// UDP port LIFX devices listen on.
pub const LIFX_PORT: u16 = 56700;

/// A sensible wait for replies on a quiet LAN, used as a discovery timeout.
pub const NORMAL_TIMEOUT: Duration = Duration::from_millis(250);

/// Recommended maximum number of messages per second sent to any one device.
pub const MESSAGE_RATE: u32 = 20;

/// Settings for a [`crate::Connector`].
///
/// # Examples
///
/// ```
/// use lifx_lan_rs::ConnectorConfig;
///
/// let config = ConnectorConfig::default().bind_addr("127.0.0.1:0".parse().unwrap());
/// assert_eq!(config.broadcast_addr.port(), 56700);
/// assert_eq!(config.read_buffer_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Local address of the connector's socket.
    pub bind_addr: SocketAddr,
    /// Destination of broadcast sends.
    pub broadcast_addr: SocketAddr,
    /// Receive buffer size; datagrams longer than this are cut short.
    pub read_buffer_size: usize,
    /// Number of sent/received messages kept for diagnostics.
    pub history_size: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        ConnectorConfig {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, LIFX_PORT)),
            broadcast_addr: SocketAddr::from((Ipv4Addr::BROADCAST, LIFX_PORT)),
            // Largest payload in the catalog is the 64-byte echo.
            read_buffer_size: HEADER_SIZE + 64,
            history_size: MessageHistory::DEFAULT_MAX_ENTRIES,
        }
    }
}

impl ConnectorConfig {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn broadcast_addr(mut self, addr: SocketAddr) -> Self {
        self.broadcast_addr = addr;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }
}
